use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info};

use crate::{config::Config, error::Error};

// Best-effort notification mailer. Every message is handed to a spawned task,
// there is no queue, no retry and no delivery confirmation, failures only end
// up in the log. The comment author never sees a mail error.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    owner: Mailbox,
    blog_url: String,
}

impl Mailer {
    // returns `None` when the config has no `[mail]` section.
    pub fn from_config(config: &Config) -> Result<Option<Self>, Error> {
        let Some(mail) = config.mail() else {
            info!("no mail config found, comment notifications are disabled");
            return Ok(None);
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(mail.server())?
            .port(mail.port())
            .credentials(Credentials::new(mail.username(), mail.password()))
            .build();

        Ok(Some(Self {
            transport,
            from: mail.from().parse()?,
            owner: mail.owner().parse()?,
            blog_url: config.blog_url(),
        }))
    }

    fn send(&self, to: Mailbox, subject: &str, html: String) {
        let message = match Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)
        {
            Ok(message) => message,
            Err(e) => {
                error!("failed to build notification email: {}", e);
                return;
            }
        };
        let transport = self.transport.clone();
        let subject = subject.to_string();
        tokio::spawn(async move {
            match transport.send(message).await {
                Ok(_) => info!("sent notification email <{}>", subject),
                Err(e) => error!("failed to deliver notification email: {}", e),
            }
        });
    }

    // Tell the blog owner a visitor left a new comment.
    pub fn send_new_comment_email(&self, post_id: i32, post_title: &str) {
        let post_url = comment_section_url(&self.blog_url, post_id);
        self.send(
            self.owner.clone(),
            "New comment",
            new_comment_body(post_title, &post_url),
        );
    }

    // Tell a visitor somebody replied to their comment.
    pub fn send_new_reply_email(&self, to: &str, post_id: i32, post_title: &str) {
        let to = match to.parse::<Mailbox>() {
            Ok(to) => to,
            Err(e) => {
                error!("invalid reply notification recipient {}: {}", to, e);
                return;
            }
        };
        let post_url = comment_section_url(&self.blog_url, post_id);
        self.send(to, "New reply", new_reply_body(post_title, &post_url));
    }
}

fn comment_section_url(blog_url: &str, post_id: i32) -> String {
    if blog_url.ends_with('/') {
        format!("{}post/{}#comments", blog_url, post_id)
    } else {
        format!("{}/post/{}#comments", blog_url, post_id)
    }
}

fn new_comment_body(post_title: &str, post_url: &str) -> String {
    format!(
        "<p>New comment in post <i>{}</i>, click the link below to check:</p>\
         <p><a href=\"{}\">{}</a></p>\
         <p><small style=\"color: #868e96\">Do not reply this email.</small></p>",
        post_title, post_url, post_url
    )
}

fn new_reply_body(post_title: &str, post_url: &str) -> String {
    format!(
        "<p>New reply for the comment you left in post <i>{}</i>, click the link below to check:</p>\
         <p><a href=\"{}\">{}</a></p>\
         <p><small style=\"color: #868e96\">Do not reply this email.</small></p>",
        post_title, post_url, post_url
    )
}

#[cfg(test)]
mod tests {
    use super::{comment_section_url, new_comment_body, new_reply_body};

    #[test]
    fn test_comment_section_url() {
        assert_eq!(
            comment_section_url("https://breakblog.me", 42),
            "https://breakblog.me/post/42#comments"
        );
        assert_eq!(
            comment_section_url("https://breakblog.me/", 42),
            "https://breakblog.me/post/42#comments"
        );
    }

    #[test]
    fn test_notification_bodies() {
        let body = new_comment_body("Hello World", "https://breakblog.me/post/1#comments");
        assert!(body.contains("New comment in post <i>Hello World</i>"));
        assert!(body.contains("href=\"https://breakblog.me/post/1#comments\""));

        let body = new_reply_body("Hello World", "https://breakblog.me/post/1#comments");
        assert!(body.contains("New reply for the comment you left in post <i>Hello World</i>"));
        assert!(body.contains("Do not reply this email."));
    }
}
