use crate::{Error, Result};

const MAX_IDENTIFIER_LEN: usize = 128;

/// Rejects names that cannot be quoted safely with `quote`.
pub fn validate_identifier(name: &str, quote: char) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidIdentifier("<empty>".to_string()));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::InvalidIdentifier(format!(
            "{}... ({} bytes)",
            &name[..name.char_indices().nth(16).map_or(name.len(), |(i, _)| i)],
            name.len()
        )));
    }
    if name.contains(quote) || name.contains('\0') || name.contains(';') {
        return Err(Error::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}
