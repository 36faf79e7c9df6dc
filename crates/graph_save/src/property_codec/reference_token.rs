use std::fmt;

/// Prefix of a reference into the global object list.
pub const GLOBAL_PREFIX: &str = "![Global]:";
/// Prefix of a deferred asset reference.
pub const SOFT_OBJECT_PREFIX: &str = "![SoftObject]:";

/// Textual stand-in for an object-valued field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefToken {
    /// `![Global]:<index>`
    Global(u32),
    /// `!<level>:<index>`
    Local { level: String, index: u32 },
    /// `![SoftObject]:<path>`
    Soft(String),
}

impl RefToken {
    /// Prefix of local references for `level`.
    pub fn local_prefix(level: &str) -> String {
        format!("!{level}:")
    }

    /// Match `text` against the global, current-level and soft prefixes, in
    /// that order. `Ok(None)` means the text is plain native encoding.
    pub fn parse(text: &str, level: &str) -> Result<Option<RefToken>, TokenError> {
        if let Some(rest) = text.strip_prefix(GLOBAL_PREFIX) {
            return parse_index(rest).map(|i| Some(RefToken::Global(i)));
        }
        let local = Self::local_prefix(level);
        if let Some(rest) = text.strip_prefix(local.as_str()) {
            return parse_index(rest).map(|index| {
                Some(RefToken::Local {
                    level: level.to_string(),
                    index,
                })
            });
        }
        if let Some(rest) = text.strip_prefix(SOFT_OBJECT_PREFIX) {
            return Ok(Some(RefToken::Soft(rest.to_string())));
        }
        if looks_like_foreign_local(text) {
            return Err(TokenError::ForeignLevel(text.to_string()));
        }
        Ok(None)
    }

    /// Index and list of an indexed token.
    pub fn index(&self) -> Option<(u32, bool)> {
        match self {
            RefToken::Global(i) => Some((*i, true)),
            RefToken::Local { index, .. } => Some((*index, false)),
            RefToken::Soft(_) => None,
        }
    }

    /// Text before the index or path, e.g. `![Global]:`.
    pub fn prefix(&self) -> String {
        match self {
            RefToken::Global(_) => GLOBAL_PREFIX.to_string(),
            RefToken::Local { level, .. } => Self::local_prefix(level),
            RefToken::Soft(_) => SOFT_OBJECT_PREFIX.to_string(),
        }
    }
}

impl fmt::Display for RefToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefToken::Global(i) => write!(f, "{GLOBAL_PREFIX}{i}"),
            RefToken::Local { level, index } => write!(f, "!{level}:{index}"),
            RefToken::Soft(path) => write!(f, "{SOFT_OBJECT_PREFIX}{path}"),
        }
    }
}

/// Why a token-looking string could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    BadIndex(String),
    /// A local reference saved in a different level.
    ForeignLevel(String),
}

fn parse_index(text: &str) -> Result<u32, TokenError> {
    text.trim()
        .parse::<u32>()
        .map_err(|_| TokenError::BadIndex(text.to_string()))
}

/// `!Name:123` with a level name other than the current one.
fn looks_like_foreign_local(text: &str) -> bool {
    let Some(rest) = text.strip_prefix('!') else {
        return false;
    };
    match rest.rsplit_once(':') {
        Some((level, index)) => {
            !level.is_empty() && !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}
