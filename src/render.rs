use crate::digest::DigestBody;
use chrono::{DateTime, Utc};

/// A rendered, ready-to-send digest message. Both delivery channels take
/// this as-is; nothing downstream edits the body.
#[derive(Debug, Clone)]
pub struct DigestEmail {
    pub subject: String,
    pub from: String,
    pub html_body: String,
}

/// Wrap the digest body in the fixed Ridgeline shell. The shell is static;
/// only the body and the masthead date vary between runs.
pub fn render_email(digest: &DigestBody, from: String, now: DateTime<Utc>) -> DigestEmail {
    let date = now.format("%B %d, %Y");

    DigestEmail {
        subject: format!("Ridgeline Daily - {date}"),
        from,
        html_body: format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <style>
        body {{ font-family: Georgia, serif; line-height: 1.8; color: #333; background: #f9f9f9; }}
        .container {{ max-width: 700px; margin: 0 auto; background: white; }}
        .header {{ background: linear-gradient(135deg, #2d5016, #4a7c59); color: white; padding: 40px 30px; text-align: center; }}
        .header h1 {{ margin: 0; font-size: 32px; font-weight: normal; }}
        .header p {{ margin: 10px 0 0 0; font-size: 16px; opacity: 0.9; }}
        .content {{ padding: 40px 30px; }}
        .content h2 {{ color: #2d5016; border-bottom: 2px solid #4a7c59; padding-bottom: 10px; margin-top: 30px; }}
        .content h3 {{ color: #333; margin-top: 20px; margin-bottom: 10px; }}
        .content p {{ margin: 10px 0; }}
        .footer {{ background: #f5f5f5; padding: 30px; text-align: center; color: #666; font-size: 14px; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>&#127956;&#65039; Ridgeline Daily</h1>
            <p>{date}</p>
        </div>
        <div class="content">
            {body}
        </div>
        <div class="footer">
            <p>Your daily digest of Appalachian region news</p>
            <p>Free to read up top, worth-a-subscription picks below</p>
        </div>
    </div>
</body>
</html>"#,
            date = date,
            body = digest.html,
        ),
    }
}
