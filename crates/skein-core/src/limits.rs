//! Input validation limits for resource protection

/// Deepest container/object nesting accepted by encode, decode, transform
/// and tree parsing (256)
pub const MAX_GRAPH_DEPTH: usize = 256;

/// Default and largest bracket nesting accepted when parsing encoded text
/// (513): two brackets per definition level plus one for a `$ref`
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 2 * MAX_GRAPH_DEPTH + 1;

/// Maximum length for a type tag (256 bytes)
pub const MAX_TYPE_TAG_LEN: usize = 256;

/// Validation error type
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyTypeTag,
    TypeTagTooLong { len: usize, max: usize },
    TypeTagWhitespace(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTypeTag => write!(f, "Type tag cannot be empty"),
            Self::TypeTagTooLong { len, max } => {
                write!(f, "Type tag too long: {} bytes (max {})", len, max)
            }
            Self::TypeTagWhitespace(tag) => {
                write!(f, "Type tag contains whitespace: {:?}", tag)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a type tag
pub fn validate_type_tag(tag: &str) -> Result<(), ValidationError> {
    if tag.is_empty() {
        return Err(ValidationError::EmptyTypeTag);
    }
    if tag.len() > MAX_TYPE_TAG_LEN {
        return Err(ValidationError::TypeTagTooLong {
            len: tag.len(),
            max: MAX_TYPE_TAG_LEN,
        });
    }
    if tag.chars().any(char::is_whitespace) {
        return Err(ValidationError::TypeTagWhitespace(tag.to_string()));
    }
    Ok(())
}

/// Deepest bracket nesting of JSON text, ignoring brackets inside strings.
///
/// Stops scanning as soon as `max` is exceeded and returns the depth reached.
pub fn nesting_depth(text: &str, max: usize) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for byte in text.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                if depth > deepest {
                    deepest = depth;
                    if deepest > max {
                        break;
                    }
                }
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}
