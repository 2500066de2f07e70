//! The newsletter email layout.

/// Escape text for interpolation into HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the newsletter body. Title and message are escaped; message line
/// breaks become `<br>`.
pub fn render_newsletter(title: &str, message: &str, site_url: &str) -> String {
    let title = escape_html(title.trim());
    let message = escape_html(message.trim())
        .replace("\r\n", "\n")
        .replace('\n', "<br>\n");
    let site_url = escape_html(site_url.trim_end_matches('/'));

    format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body style="margin:0;padding:0;background:#fdf6ef;font-family:Georgia,serif;color:#4a3426;">
<table role="presentation" width="100%" cellspacing="0" cellpadding="0">
<tr><td align="center" style="padding:32px 16px;">
<table role="presentation" width="600" cellspacing="0" cellpadding="0" style="background:#ffffff;border-radius:12px;">
<tr><td style="padding:32px;">
<h1 style="margin:0 0 24px;font-size:26px;color:#b5651d;">{title}</h1>
<p style="margin:0 0 24px;font-size:16px;line-height:1.6;">{message}</p>
<p style="margin:0;font-size:14px;"><a href="{site_url}" style="color:#b5651d;">Voir les dernières recettes</a></p>
</td></tr>
</table>
<p style="font-size:12px;color:#9a8372;margin:16px 0 0;">Vous recevez cet email car vous êtes inscrit(e) à la newsletter.</p>
</td></tr>
</table>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_render_interpolates_and_escapes() {
        let html = render_newsletter(
            "Printemps <3",
            "Bonjour !\nTrois nouvelles recettes.",
            "https://patisserie.example/",
        );
        assert!(html.contains("<h1 style=\"margin:0 0 24px;font-size:26px;color:#b5651d;\">Printemps &lt;3</h1>"));
        assert!(html.contains("Bonjour !<br>\nTrois nouvelles recettes."));
        assert!(html.contains("href=\"https://patisserie.example\""));
        assert!(!html.contains("<3"));
    }
}
