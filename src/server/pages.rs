//! Minimal HTML for the admin surface. The pages are placeholders around the JSON API.

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

pub fn login_page(admin_route: &str, error: Option<&str>) -> String {
    let error_html = error
        .map(|e| format!("<p class=\"error\">{}</p>", escape(e)))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>imgvault login</title></head>
<body>
<h1>imgvault</h1>
{error_html}
<form method="post" action="{action}/login">
  <label>Username <input name="username" autocomplete="username" required></label>
  <label>Password <input name="password" type="password" autocomplete="current-password" required></label>
  <button type="submit">Sign in</button>
</form>
</body>
</html>
"#,
        error_html = error_html,
        action = escape(admin_route),
    )
}

pub fn shell_page(admin_route: &str, user: &str) -> String {
    let base = escape(admin_route);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>imgvault</title></head>
<body>
<header>Signed in as {user} &middot; <a href="{base}/logout">Log out</a></header>
<nav>
  <a href="{base}/api/dashboard">Dashboard</a>
  <a href="{base}/api/browse?path=">Browse</a>
  <a href="{base}/api/batch_export?path=">Export links</a>
</nav>
</body>
</html>
"#,
        user = escape(user),
        base = base,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_page_escapes_error() {
        let html = login_page("/admin", Some("<bad>"));
        assert!(html.contains("&lt;bad&gt;"));
        assert!(html.contains(r#"action="/admin/login""#));
        assert!(!login_page("/admin", None).contains("class=\"error\""));
    }

    #[test]
    fn shell_links_use_admin_route() {
        let html = shell_page("/manage", "op");
        assert!(html.contains("/manage/api/dashboard"));
        assert!(html.contains("/manage/logout"));
    }
}
