use validator::validate_email;

/// A syntactically valid email address, normalised to lowercase.
///
/// The only way to get one is through `parse` (or deserialization, which goes through `parse`),
/// so holding a `WaitlistEmail` means validation already happened.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct WaitlistEmail(String);

impl WaitlistEmail {
    pub fn parse(s: String) -> Result<WaitlistEmail, String> {
        let normalised = s.to_lowercase();

        // `validate_email` is happy with single-label domains (`user@localhost`), we want a
        // domain that can actually receive mail from the outside world.
        let has_dotted_domain = normalised
            .rsplit_once('@')
            .map(|(_, domain)| {
                domain
                    .split('.')
                    .filter(|label| !label.is_empty())
                    .count()
                    > 1
            })
            .unwrap_or(false);

        if validate_email(normalised.as_str()) && has_dotted_domain {
            Ok(Self(normalised))
        } else {
            Err(format!("{s} is not a valid email address."))
        }
    }
}

impl TryFrom<String> for WaitlistEmail {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl AsRef<str> for WaitlistEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WaitlistEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
