//! `$cookie` advanced modifier
//!
//! Carries the cookie name the rule targets plus the optional `sameSite`
//! and `maxAge` suboptions. A cookie modifier with neither suboption blocks
//! the cookie; with at least one it modifies the stored cookie instead.

/// `SameSite` cookie attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    None,
    Lax,
    Strict,
}

impl SameSite {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "lax" => Some(Self::Lax),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

/// Parsed `$cookie` modifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieModifier {
    /// Cookie name to match. Empty matches every cookie.
    pub name: String,
    pub same_site: Option<SameSite>,
    pub max_age: Option<u64>,
}

impl CookieModifier {
    /// Parse the value of a `cookie=` option. Suboptions are `;`-separated:
    /// `cookie=name;maxAge=3600;sameSite=lax`.
    pub fn parse(value: &str) -> Result<Self, String> {
        let mut parts = value.split(';');
        let name = parts.next().unwrap_or("").trim().to_string();

        let mut modifier = Self {
            name,
            same_site: None,
            max_age: None,
        };

        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, val) = part
                .split_once('=')
                .ok_or_else(|| format!("invalid cookie suboption: {part}"))?;
            modifier.set_suboption(key.trim(), val.trim())?;
        }

        Ok(modifier)
    }

    /// Apply one `key=value` suboption. Also used to fold the comma-form
    /// (`$cookie=name,maxAge=60`) back into the modifier.
    pub fn set_suboption(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key.to_ascii_lowercase().as_str() {
            "maxage" => {
                let age: u64 = value
                    .parse()
                    .map_err(|_| format!("invalid maxAge value: {value}"))?;
                self.max_age = Some(age);
                Ok(())
            }
            "samesite" => {
                self.same_site = Some(
                    SameSite::parse(value).ok_or_else(|| format!("invalid sameSite value: {value}"))?,
                );
                Ok(())
            }
            _ => Err(format!("unknown cookie suboption: {key}")),
        }
    }

    /// Whether a cookie with the given name is targeted by this modifier.
    pub fn matches(&self, cookie_name: &str) -> bool {
        self.name.is_empty() || self.name == cookie_name
    }

    /// A modifying rule rewrites cookie attributes instead of dropping the
    /// cookie.
    pub fn is_modifying(&self) -> bool {
        self.same_site.is_some() || self.max_age.is_some_and(|age| age > 0)
    }
}
