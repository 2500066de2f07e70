//! Image upload pipeline: random naming, HEIC conversion and cleanup.

use bytes::Bytes;
use serde_json::json;

use super::ObjectStore;
use crate::errors::AppError;

/// An image file received from the admin form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Bytes,
}

/// Where an uploaded image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub path: String,
    pub url: String,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "avif", "heic", "heif"];

fn extension_of(upload: &ImageUpload) -> Option<String> {
    let from_name = upload
        .file_name
        .as_deref()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));

    from_name.or_else(|| {
        let ext = match upload.content_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/avif" => "avif",
            "image/heic" => "heic",
            "image/heif" => "heif",
            _ => return None,
        };
        Some(ext.to_string())
    })
}

/// Content type to store the object with. Browsers often send HEIC files as
/// `application/octet-stream`.
fn content_type_for(upload: &ImageUpload, ext: &str) -> String {
    if upload.content_type.starts_with("image/") {
        return upload.content_type.clone();
    }
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "heic" => "image/heic",
        "heif" => "image/heif",
        other => return format!("image/{}", other),
    }
    .to_string()
}

/// Upload an image under `folder/` with a random name and return its public URL.
///
/// HEIC/HEIF files go through the conversion function. Conversion failures are
/// logged and the original file is kept.
pub async fn store_image(
    store: &dyn ObjectStore,
    convert_function: &str,
    folder: &str,
    upload: ImageUpload,
) -> Result<StoredImage, AppError> {
    if upload.data.is_empty() {
        return Err(AppError::Validation("Image file is empty".to_string()));
    }
    let ext = extension_of(&upload).ok_or_else(|| {
        AppError::Validation(format!(
            "Unsupported image type '{}'",
            upload.content_type
        ))
    })?;

    let content_type = content_type_for(&upload, &ext);
    let original = format!("{}/{}.{}", folder, uuid::Uuid::new_v4(), ext);
    store.upload(&original, upload.data, &content_type).await?;

    let path = if ext == "heic" || ext == "heif" {
        convert_heic(store, convert_function, original).await
    } else {
        original
    };

    Ok(StoredImage {
        url: store.public_url(&path),
        path,
    })
}

async fn convert_heic(store: &dyn ObjectStore, function: &str, original: String) -> String {
    let converted = match store.invoke(function, json!({ "path": original })).await {
        Ok(value) => value
            .get("path")
            .and_then(|p| p.as_str())
            .filter(|p| !p.is_empty())
            .map(str::to_string),
        Err(e) => {
            tracing::warn!("Image conversion failed for {}, keeping original: {}", original, e);
            return original;
        }
    };

    match converted {
        Some(path) if path != original => {
            discard_image(store, &original).await;
            path
        }
        Some(_) => original,
        None => {
            tracing::warn!("Image conversion for {} returned no path, keeping original", original);
            original
        }
    }
}

/// Best-effort removal of an object, e.g. an upload whose database write failed.
pub async fn discard_image(store: &dyn ObjectStore, path: &str) {
    if let Err(e) = store.remove(&[path.to_string()]).await {
        tracing::warn!("Failed to remove stored image {}: {}", path, e);
    }
}

/// Best-effort removal of the object behind a stored public URL. URLs that do
/// not point into the bucket are left alone.
pub async fn remove_image_url(store: &dyn ObjectStore, url: &str) {
    match store.path_from_url(url) {
        Some(path) => discard_image(store, &path).await,
        None => tracing::debug!("Image {} is not in the bucket, nothing to remove", url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::{Conversion, MemoryStore};

    fn upload(name: &str, content_type: &str) -> ImageUpload {
        ImageUpload {
            file_name: Some(name.to_string()),
            content_type: content_type.to_string(),
            data: Bytes::from_static(b"fake image bytes"),
        }
    }

    #[tokio::test]
    async fn test_store_jpeg_uses_random_name() {
        let store = MemoryStore::new();
        let stored = store_image(&store, "convert-heic", "recipes", upload("tarte.JPG", "image/jpeg"))
            .await
            .unwrap();

        assert!(stored.path.starts_with("recipes/"));
        assert!(stored.path.ends_with(".jpg"));
        assert!(!stored.path.contains("tarte"));
        assert_eq!(stored.url, store.public_url(&stored.path));
        assert!(store.contains(&stored.path));
        assert!(store.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_non_images() {
        let store = MemoryStore::new();
        let err = store_image(&store, "convert-heic", "recipes", upload("notes.txt", "text/plain"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.object_count(), 0);
    }

    #[tokio::test]
    async fn test_heic_is_converted() {
        let store = MemoryStore::with_conversion(Conversion::ToJpeg);
        let stored = store_image(
            &store,
            "convert-heic",
            "creations",
            upload("IMG_0001.HEIC", "application/octet-stream"),
        )
        .await
        .unwrap();

        assert!(stored.path.ends_with(".jpg"));
        assert!(store.contains(&stored.path));
        assert_eq!(store.object_count(), 1);
        assert_eq!(store.invocations().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_conversion_keeps_original() {
        let store = MemoryStore::with_conversion(Conversion::Fail);
        let stored = store_image(&store, "convert-heic", "creations", upload("a.heic", "image/heic"))
            .await
            .unwrap();

        assert!(stored.path.ends_with(".heic"));
        assert!(store.contains(&stored.path));
    }

    #[tokio::test]
    async fn test_remove_image_url_ignores_foreign_urls() {
        let store = MemoryStore::new();
        let stored = store_image(&store, "convert-heic", "recipes", upload("a.png", "image/png"))
            .await
            .unwrap();

        remove_image_url(&store, "https://cdn.example.com/a.png").await;
        assert!(store.contains(&stored.path));

        remove_image_url(&store, &stored.url).await;
        assert!(!store.contains(&stored.path));
    }
}
