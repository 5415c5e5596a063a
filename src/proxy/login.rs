//! Scraping and filling the proxy's login form.

use url::form_urlencoded;

use crate::html::{StartTag, TagScanner};

use super::ProxyError;

/// The login form found on a proxy login page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// The raw `action` attribute; resolve it against the page URL.
    pub action: String,
    /// Named `<input>` fields in page order.
    pub inputs: Vec<(String, String)>,
}

impl LoginForm {
    /// Encodes the form body: page inputs first, then `overrides` replacing
    /// same-named fields or appended after them.
    #[must_use]
    pub fn encode_body(&self, overrides: &[(String, String)]) -> String {
        let mut values = self.inputs.clone();
        for (name, value) in overrides {
            match values.iter_mut().find(|(existing, _)| existing == name) {
                Some(slot) => slot.1.clone_from(value),
                None => values.push((name.clone(), value.clone())),
            }
        }
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(values)
            .finish()
    }
}

/// Streams a login page and collects its form.
#[derive(Debug, Default)]
pub struct LoginPageParser {
    scanner: TagScanner,
    action: Option<String>,
    inputs: Vec<(String, String)>,
}

impl LoginPageParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next chunk of the page.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::UnexpectedFormMethod`] when the form does not post.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), ProxyError> {
        for tag in self.scanner.feed(chunk) {
            self.handle_tag(&tag)?;
        }
        Ok(())
    }

    fn handle_tag(&mut self, tag: &StartTag) -> Result<(), ProxyError> {
        match tag.name.as_str() {
            "form" if self.action.is_none() => {
                let method = tag.attr("method").unwrap_or("get");
                if !method.eq_ignore_ascii_case("post") {
                    return Err(ProxyError::UnexpectedFormMethod {
                        method: method.to_string(),
                    });
                }
                self.action = tag.attr("action").map(str::to_string);
            }
            "input" => {
                if let Some(name) = tag.attr("name") {
                    let value = tag.attr("value").unwrap_or_default();
                    self.inputs.push((name.to_string(), value.to_string()));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Returns the form once the whole page has been fed.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::MalformedLoginPage`] when no form action was seen.
    pub fn finish(self, page_url: &str) -> Result<LoginForm, ProxyError> {
        let action = self.action.ok_or_else(|| ProxyError::MalformedLoginPage {
            url: page_url.to_string(),
        })?;
        Ok(LoginForm {
            action,
            inputs: self.inputs,
        })
    }
}
