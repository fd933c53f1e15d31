use anyhow::{anyhow, bail};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;

pub const USER_WELCOME: &str = "user_welcome";
pub const PASSWORD_RESET: &str = "password_reset";

struct Template {
    name: &'static str,
    subject: &'static str,
    body: &'static str,
}

const TEMPLATES: &[Template] = &[
    Template {
        name: USER_WELCOME,
        subject: "Welcome to FollowUps!",
        body: "Hi,\n\n\
               Thanks for signing up for a FollowUps account. \
               Your user ID number is {{userId}}.\n\n\
               Please send a request to the `PUT /v1/users/activated` endpoint with the \
               following JSON body to activate your account:\n\n\
               {\"token\": \"{{activationToken}}\"}\n\n\
               Please note that this is a one-time use token \
               and it will expire in {{expiresIn}}.\n\n\
               Thanks,\n\nThe FollowUps Team\n",
    },
    Template {
        name: PASSWORD_RESET,
        subject: "Reset your FollowUps password",
        body: "Hi,\n\n\
               Please send a `PUT /v1/users/updatepassword` request with the following JSON \
               body to set a new password:\n\n\
               {\"password\": \"your new password\", \"token\": \"{{passwordResetToken}}\"}\n\n\
               Please note that this is a one-time use token \
               and it will expire in {{expiresIn}}. \
               If you did not ask for a reset you can ignore this message.\n\n\
               Thanks,\n\nThe FollowUps Team\n",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub subject: String,
    pub plain_body: String,
}

/// Token lifetime in words, in the largest whole unit: `3 days`, `90 minutes`.
pub fn describe_lifetime(ttl: time::Duration) -> String {
    let minutes = ttl.whole_minutes().max(0);
    let (n, unit) = if minutes > 0 && minutes % (24 * 60) == 0 {
        (minutes / (24 * 60), "day")
    } else if minutes > 0 && minutes % 60 == 0 {
        (minutes / 60, "hour")
    } else {
        (minutes, "minute")
    };
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// Fills `{{key}}` placeholders of the named template from the `data` object.
pub fn render(name: &str, data: &Value) -> anyhow::Result<Rendered> {
    let template = TEMPLATES
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| anyhow!("unknown email template {name:?}"))?;
    Ok(Rendered {
        subject: fill(template.subject, data)?,
        plain_body: fill(template.body, data)?,
    })
}

fn fill(text: &str, data: &Value) -> anyhow::Result<String> {
    lazy_static! {
        static ref PLACEHOLDER: Regex = Regex::new(r"\{\{\s*(\w+)\s*\}\}").unwrap();
    }

    if let Some(missing) = PLACEHOLDER
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .find(|key| data.get(key).is_none())
    {
        bail!("template value {missing:?} not provided");
    }

    Ok(PLACEHOLDER
        .replace_all(text, |c: &Captures| match &data[&c[1]] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_welcome() {
        let out = render(
            USER_WELCOME,
            &json!({
                "userId": 1,
                "activationToken": "Y3Hf2Pxk9aDtkl2p0ZqfbQ",
                "expiresIn": "2 days",
            }),
        )
        .unwrap();
        assert_eq!(out.subject, "Welcome to FollowUps!");
        assert!(out.plain_body.contains("user ID number is 1."));
        assert!(out.plain_body.contains("{\"token\": \"Y3Hf2Pxk9aDtkl2p0ZqfbQ\"}"));
        assert!(out.plain_body.contains("it will expire in 2 days."));
    }

    #[test]
    fn lifetimes_in_words() {
        assert_eq!(describe_lifetime(time::Duration::hours(72)), "3 days");
        assert_eq!(describe_lifetime(time::Duration::hours(24)), "1 day");
        assert_eq!(describe_lifetime(time::Duration::hours(3)), "3 hours");
        assert_eq!(describe_lifetime(time::Duration::minutes(90)), "90 minutes");
        assert_eq!(describe_lifetime(time::Duration::minutes(1)), "1 minute");
    }

    #[test]
    fn missing_value_is_an_error() {
        let err = render(PASSWORD_RESET, &json!({})).unwrap_err();
        assert!(err.to_string().contains("passwordResetToken"));
    }

    #[test]
    fn unknown_template_is_an_error() {
        assert!(render("nope", &json!({})).is_err());
    }
}
