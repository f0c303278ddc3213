//! Compiled route patterns

use regex::Regex;

use hearth_plugin_api::CommandArgs;

use super::Location;
use crate::error::RouterError;

/// A route pattern anchored at both ends of the path
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
}

impl RoutePattern {
    pub fn compile(pattern: &str) -> Result<Self, RouterError> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
            RouterError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as registered
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Command arguments for `location`, `None` when the path does not match.
    ///
    /// Every capture group becomes a positional argument, groups that did
    /// not participate become `""`. Named groups are also flags, next to
    /// `path`, `search`, `hash` and `request`.
    pub fn match_location(&self, location: &Location) -> Option<CommandArgs> {
        let captures = self.regex.captures(&location.path)?;
        let mut args = CommandArgs::default();

        for group in captures.iter().skip(1) {
            args.args
                .push(group.map(|m| m.as_str().to_string()).unwrap_or_default());
        }
        for name in self.regex.capture_names().flatten() {
            let value = captures.name(name).map(|m| m.as_str()).unwrap_or_default();
            args.flags.insert(name.to_string(), value.to_string());
        }

        args.flags.insert("path".into(), location.path.clone());
        args.flags.insert("search".into(), location.search.clone());
        args.flags.insert("hash".into(), location.hash.clone());
        args.flags.insert("request".into(), location.request.clone());
        Some(args)
    }
}
