//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::errors::{conflict_on_unique, AppError};
use crate::models::{
    now_timestamp, Article, ArticleDraft, Campaign, Creation, CreationRequest, Difficulty,
    Ingredient, Recipe, RecipeDraft, RecipeStep, Subscriber, User,
};

const RECIPE_COLUMNS: &str = "id, title, slug, description, difficulty, prep_time, cook_time, base_portions, category, image, published, created_at, updated_at";
const CREATION_COLUMNS: &str = "id, title, description, image, published, created_at, updated_at";
const ARTICLE_COLUMNS: &str =
    "id, title, slug, excerpt, content, tags, image, published_at, created_at, updated_at";
const CAMPAIGN_COLUMNS: &str =
    "id, title, message, scheduled_at, sent_at, recipient_count, created_at";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== USER OPERATIONS ====================

    /// Find a user by (normalized) email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query("SELECT id, email, password, role FROM users WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| User {
            id: row.get("id"),
            email: row.get("email"),
            password: row.get("password"),
            role: row.get("role"),
        }))
    }

    /// Create a user from an already hashed password.
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let email = email.trim().to_lowercase();

        sqlx::query("INSERT INTO users (id, email, password, role, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(&id)
            .bind(&email)
            .bind(password_hash)
            .bind(role)
            .bind(now_timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, format!("User {} already exists", email)))?;

        Ok(User {
            id,
            email,
            password: password_hash.to_string(),
            role: role.to_string(),
        })
    }

    // ==================== RECIPE OPERATIONS ====================

    /// List recipes, newest first.
    pub async fn list_recipes(
        &self,
        published_only: bool,
        category: Option<&str>,
    ) -> Result<Vec<Recipe>, AppError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {RECIPE_COLUMNS} FROM recipes
               WHERE (? = 0 OR published = 1) AND (? IS NULL OR category = ?)
               ORDER BY created_at DESC, rowid DESC"#
        ))
        .bind(published_only as i32)
        .bind(category)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        let mut recipes = Vec::with_capacity(rows.len());
        for row in &rows {
            recipes.push(self.recipe_with_children(row).await?);
        }
        Ok(recipes)
    }

    /// Get a recipe with its ingredients and steps.
    pub async fn get_recipe(&self, id: &str) -> Result<Option<Recipe>, AppError> {
        let row = sqlx::query(&format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.recipe_with_children(&row).await?)),
            None => Ok(None),
        }
    }

    pub async fn get_recipe_by_slug(&self, slug: &str) -> Result<Option<Recipe>, AppError> {
        let row = sqlx::query(&format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE slug = ?"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.recipe_with_children(&row).await?)),
            None => Ok(None),
        }
    }

    async fn recipe_with_children(&self, row: &SqliteRow) -> Result<Recipe, AppError> {
        let id: String = row.get("id");

        let ingredients = sqlx::query(
            "SELECT id, name, quantity, unit FROM ingredients WHERE recipe_id = ? ORDER BY position",
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(ingredient_from_row)
        .collect();

        let steps = sqlx::query(
            "SELECT id, step_order, description, duration, ingredients FROM recipe_steps WHERE recipe_id = ? ORDER BY step_order",
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(step_from_row)
        .collect();

        Ok(recipe_from_row(row, ingredients, steps))
    }

    /// Create a recipe and its children in one transaction.
    pub async fn create_recipe(&self, draft: &RecipeDraft) -> Result<Recipe, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO recipes ({RECIPE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&id)
        .bind(&draft.title)
        .bind(&draft.slug)
        .bind(&draft.description)
        .bind(draft.difficulty.as_str())
        .bind(draft.prep_time)
        .bind(draft.cook_time)
        .bind(draft.base_portions)
        .bind(&draft.category)
        .bind(&draft.image)
        .bind(draft.published as i32)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| recipe_slug_conflict(e, &draft.slug))?;

        let (ingredients, steps) = insert_recipe_children(&mut tx, &id, draft).await?;

        tx.commit().await?;

        Ok(recipe_from_draft(id, draft, now.clone(), now, ingredients, steps))
    }

    /// Replace a recipe: scalar fields are overwritten and every ingredient and
    /// step row is deleted and recreated, all in one transaction.
    pub async fn update_recipe(&self, id: &str, draft: &RecipeDraft) -> Result<Recipe, AppError> {
        let now = now_timestamp();

        let mut tx = self.pool.begin().await?;

        let created_at: String = sqlx::query("SELECT created_at FROM recipes WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| row.get("created_at"))
            .ok_or_else(|| AppError::NotFound(format!("Recipe {} not found", id)))?;

        sqlx::query(
            r#"UPDATE recipes SET
                title = ?, slug = ?, description = ?, difficulty = ?, prep_time = ?,
                cook_time = ?, base_portions = ?, category = ?, image = ?, published = ?,
                updated_at = ?
            WHERE id = ?"#,
        )
        .bind(&draft.title)
        .bind(&draft.slug)
        .bind(&draft.description)
        .bind(draft.difficulty.as_str())
        .bind(draft.prep_time)
        .bind(draft.cook_time)
        .bind(draft.base_portions)
        .bind(&draft.category)
        .bind(&draft.image)
        .bind(draft.published as i32)
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| recipe_slug_conflict(e, &draft.slug))?;

        sqlx::query("DELETE FROM ingredients WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM recipe_steps WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let (ingredients, steps) = insert_recipe_children(&mut tx, id, draft).await?;

        tx.commit().await?;

        Ok(recipe_from_draft(
            id.to_string(),
            draft,
            created_at,
            now,
            ingredients,
            steps,
        ))
    }

    /// Delete a recipe. Ingredients and steps go with it (ON DELETE CASCADE).
    pub async fn delete_recipe(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Recipe {} not found", id)));
        }
        Ok(())
    }

    // ==================== CREATION OPERATIONS ====================

    pub async fn list_creations(&self, published_only: bool) -> Result<Vec<Creation>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {CREATION_COLUMNS} FROM creations WHERE (? = 0 OR published = 1) ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(published_only as i32)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(creation_from_row).collect())
    }

    pub async fn get_creation(&self, id: &str) -> Result<Option<Creation>, AppError> {
        let row = sqlx::query(&format!("SELECT {CREATION_COLUMNS} FROM creations WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(creation_from_row))
    }

    pub async fn create_creation(&self, request: &CreationRequest) -> Result<Creation, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(&format!(
            "INSERT INTO creations ({CREATION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.image)
        .bind(request.published as i32)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Creation {
            id,
            title: request.title.clone(),
            description: request.description.clone(),
            image: request.image.clone(),
            published: request.published,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub async fn update_creation(
        &self,
        id: &str,
        request: &CreationRequest,
    ) -> Result<Creation, AppError> {
        let existing = self
            .get_creation(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Creation {} not found", id)))?;

        let now = now_timestamp();

        sqlx::query(
            "UPDATE creations SET title = ?, description = ?, image = ?, published = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.image)
        .bind(request.published as i32)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(Creation {
            id: id.to_string(),
            title: request.title.clone(),
            description: request.description.clone(),
            image: request.image.clone(),
            published: request.published,
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    pub async fn delete_creation(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM creations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Creation {} not found", id)));
        }
        Ok(())
    }

    // ==================== ARTICLE OPERATIONS ====================

    /// List articles. Public listings only include articles whose publication
    /// date has passed, newest publication first.
    pub async fn list_articles(
        &self,
        public_only: bool,
        tag: Option<&str>,
    ) -> Result<Vec<Article>, AppError> {
        let rows = if public_only {
            sqlx::query(&format!(
                r#"SELECT {ARTICLE_COLUMNS} FROM articles
                   WHERE published_at IS NOT NULL AND published_at <= ?
                   ORDER BY published_at DESC, rowid DESC"#
            ))
            .bind(now_timestamp())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY created_at DESC, rowid DESC"
            ))
            .fetch_all(&self.pool)
            .await?
        };

        let articles = rows.iter().map(article_from_row);
        Ok(match tag.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()) {
            Some(tag) => articles
                .filter(|a| a.tags.iter().any(|t| t.to_lowercase() == tag))
                .collect(),
            None => articles.collect(),
        })
    }

    pub async fn get_article(&self, id: &str) -> Result<Option<Article>, AppError> {
        let row = sqlx::query(&format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(article_from_row))
    }

    pub async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>, AppError> {
        let row = sqlx::query(&format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE slug = ?"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(article_from_row))
    }

    pub async fn create_article(&self, draft: &ArticleDraft) -> Result<Article, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();
        let tags_json = serde_json::to_string(&draft.tags).unwrap_or_default();

        sqlx::query(&format!(
            "INSERT INTO articles ({ARTICLE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&id)
        .bind(&draft.title)
        .bind(&draft.slug)
        .bind(&draft.excerpt)
        .bind(&draft.content)
        .bind(&tags_json)
        .bind(&draft.image)
        .bind(&draft.published_at)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| article_slug_conflict(e, &draft.slug))?;

        Ok(article_from_draft(id, draft, now.clone(), now))
    }

    pub async fn update_article(&self, id: &str, draft: &ArticleDraft) -> Result<Article, AppError> {
        let existing = self
            .get_article(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Article {} not found", id)))?;

        let now = now_timestamp();
        let tags_json = serde_json::to_string(&draft.tags).unwrap_or_default();

        sqlx::query(
            r#"UPDATE articles SET
                title = ?, slug = ?, excerpt = ?, content = ?, tags = ?, image = ?,
                published_at = ?, updated_at = ?
            WHERE id = ?"#,
        )
        .bind(&draft.title)
        .bind(&draft.slug)
        .bind(&draft.excerpt)
        .bind(&draft.content)
        .bind(&tags_json)
        .bind(&draft.image)
        .bind(&draft.published_at)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| article_slug_conflict(e, &draft.slug))?;

        Ok(article_from_draft(id.to_string(), draft, existing.created_at, now))
    }

    pub async fn delete_article(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Article {} not found", id)));
        }
        Ok(())
    }

    // ==================== NEWSLETTER OPERATIONS ====================

    pub async fn add_subscriber(&self, email: &str) -> Result<Subscriber, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query("INSERT INTO newsletter_subscribers (id, email, created_at) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(email)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "This email is already subscribed"))?;

        Ok(Subscriber {
            id,
            email: email.to_string(),
            created_at: now,
        })
    }

    pub async fn list_subscribers(&self) -> Result<Vec<Subscriber>, AppError> {
        let rows = sqlx::query(
            "SELECT id, email, created_at FROM newsletter_subscribers ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Subscriber {
                id: row.get("id"),
                email: row.get("email"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    /// Every subscriber address, in subscription order.
    pub async fn subscriber_emails(&self) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("SELECT email FROM newsletter_subscribers ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("email")).collect())
    }

    pub async fn delete_subscriber(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM newsletter_subscribers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Subscriber {} not found", id)));
        }
        Ok(())
    }

    /// Record a campaign. A scheduled campaign has no `sent_at`.
    pub async fn create_campaign(
        &self,
        title: &str,
        message: &str,
        scheduled_at: Option<String>,
        sent_at: Option<String>,
        recipient_count: i64,
    ) -> Result<Campaign, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(&format!(
            "INSERT INTO newsletter_campaigns ({CAMPAIGN_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&id)
        .bind(title)
        .bind(message)
        .bind(&scheduled_at)
        .bind(&sent_at)
        .bind(recipient_count)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Campaign {
            id,
            title: title.to_string(),
            message: message.to_string(),
            scheduled_at,
            sent_at,
            recipient_count,
            created_at: now,
        })
    }

    pub async fn list_campaigns(&self) -> Result<Vec<Campaign>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM newsletter_campaigns ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Campaign {
                id: row.get("id"),
                title: row.get("title"),
                message: row.get("message"),
                scheduled_at: row.get("scheduled_at"),
                sent_at: row.get("sent_at"),
                recipient_count: row.get("recipient_count"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}

/// Insert ingredient and step rows for a recipe. Step order is the array
/// position, starting at 1.
async fn insert_recipe_children(
    conn: &mut SqliteConnection,
    recipe_id: &str,
    draft: &RecipeDraft,
) -> Result<(Vec<Ingredient>, Vec<RecipeStep>), AppError> {
    let mut ingredients = Vec::with_capacity(draft.ingredients.len());
    for (position, input) in draft.ingredients.iter().enumerate() {
        let ingredient = Ingredient {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name.clone(),
            quantity: input.quantity,
            unit: input.unit.clone(),
        };
        sqlx::query(
            "INSERT INTO ingredients (id, recipe_id, position, name, quantity, unit) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&ingredient.id)
        .bind(recipe_id)
        .bind(position as i64)
        .bind(&ingredient.name)
        .bind(ingredient.quantity)
        .bind(&ingredient.unit)
        .execute(&mut *conn)
        .await?;
        ingredients.push(ingredient);
    }

    let mut steps = Vec::with_capacity(draft.steps.len());
    for (index, input) in draft.steps.iter().enumerate() {
        let step = RecipeStep {
            id: uuid::Uuid::new_v4().to_string(),
            order: index as i64 + 1,
            description: input.description.clone(),
            duration: input.duration,
            ingredients: input.ingredients.clone(),
        };
        let used_json = serde_json::to_string(&step.ingredients).unwrap_or_default();
        sqlx::query(
            "INSERT INTO recipe_steps (id, recipe_id, step_order, description, duration, ingredients) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&step.id)
        .bind(recipe_id)
        .bind(step.order)
        .bind(&step.description)
        .bind(step.duration)
        .bind(&used_json)
        .execute(&mut *conn)
        .await?;
        steps.push(step);
    }

    Ok((ingredients, steps))
}

fn recipe_slug_conflict(err: sqlx::Error, slug: &str) -> AppError {
    conflict_on_unique(err, format!("A recipe with slug '{}' already exists", slug))
}

fn article_slug_conflict(err: sqlx::Error, slug: &str) -> AppError {
    conflict_on_unique(err, format!("An article with slug '{}' already exists", slug))
}

// Helper functions for row conversion

fn recipe_from_row(row: &SqliteRow, ingredients: Vec<Ingredient>, steps: Vec<RecipeStep>) -> Recipe {
    let difficulty: String = row.get("difficulty");
    let published: i32 = row.get("published");
    Recipe {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        difficulty: Difficulty::parse(&difficulty).unwrap_or_default(),
        prep_time: row.get("prep_time"),
        cook_time: row.get("cook_time"),
        base_portions: row.get("base_portions"),
        category: row.get("category"),
        image: row.get("image"),
        published: published != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        ingredients,
        steps,
    }
}

fn recipe_from_draft(
    id: String,
    draft: &RecipeDraft,
    created_at: String,
    updated_at: String,
    ingredients: Vec<Ingredient>,
    steps: Vec<RecipeStep>,
) -> Recipe {
    Recipe {
        id,
        title: draft.title.clone(),
        slug: draft.slug.clone(),
        description: draft.description.clone(),
        difficulty: draft.difficulty,
        prep_time: draft.prep_time,
        cook_time: draft.cook_time,
        base_portions: draft.base_portions,
        category: draft.category.clone(),
        image: draft.image.clone(),
        published: draft.published,
        created_at,
        updated_at,
        ingredients,
        steps,
    }
}

fn ingredient_from_row(row: &SqliteRow) -> Ingredient {
    Ingredient {
        id: row.get("id"),
        name: row.get("name"),
        quantity: row.get("quantity"),
        unit: row.get("unit"),
    }
}

fn step_from_row(row: &SqliteRow) -> RecipeStep {
    let used: Option<String> = row.get("ingredients");
    RecipeStep {
        id: row.get("id"),
        order: row.get("step_order"),
        description: row.get("description"),
        duration: row.get("duration"),
        ingredients: used.map(|s| parse_json_array(&s)).unwrap_or_default(),
    }
}

fn creation_from_row(row: &SqliteRow) -> Creation {
    let published: i32 = row.get("published");
    Creation {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        image: row.get("image"),
        published: published != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn article_from_row(row: &SqliteRow) -> Article {
    let tags: Option<String> = row.get("tags");
    Article {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        tags: tags.map(|s| parse_json_array(&s)).unwrap_or_default(),
        image: row.get("image"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn article_from_draft(id: String, draft: &ArticleDraft, created_at: String, updated_at: String) -> Article {
    Article {
        id,
        title: draft.title.clone(),
        slug: draft.slug.clone(),
        excerpt: draft.excerpt.clone(),
        content: draft.content.clone(),
        tags: draft.tags.clone(),
        image: draft.image.clone(),
        published_at: draft.published_at.clone(),
        created_at,
        updated_at,
    }
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
