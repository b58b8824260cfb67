//! Target path grammar.
//!
//! A query target is `<base>;<leaf>;<leaf>...`. Everything before the first
//! `;` is the base path; each remaining `;`-separated leaf is appended to it
//! with `\` for PI points or `|` for AF attributes:
//!
//! ```text
//! \\PISRV;sinusoid;cdt158        (points)     → \\PISRV\sinusoid, \\PISRV\cdt158
//! \\AF\DB\Element;Temp;Pressure  (attributes) → \\AF\DB\Element|Temp, \\AF\DB\Element|Pressure
//! ```

use crate::error::QueryError;

/// One expanded leaf of a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSegment {
    /// The leaf as written by the user; used as the frame name.
    pub label: String,
    /// Base path joined with the leaf.
    pub full_path: String,
}

/// Expand `target` into one [`TargetSegment`] per non-empty leaf.
///
/// Returns [`QueryError::InvalidTarget`] when there is no `;` separator or
/// the base path is empty.
pub fn expand(target: &str, is_pi_point: bool) -> Result<Vec<TargetSegment>, QueryError> {
    let (base, leaves) = target
        .split_once(';')
        .ok_or_else(|| QueryError::InvalidTarget(format!("{target:?} has no ';' separator")))?;

    if base.is_empty() {
        return Err(QueryError::InvalidTarget(format!(
            "{target:?} has an empty base path"
        )));
    }

    let separator = if is_pi_point { '\\' } else { '|' };

    Ok(leaves
        .split(';')
        .filter(|leaf| !leaf.is_empty())
        .map(|leaf| TargetSegment {
            label: leaf.to_string(),
            full_path: format!("{base}{separator}{leaf}"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(target: &str, is_pi_point: bool) -> Vec<String> {
        expand(target, is_pi_point)
            .unwrap()
            .into_iter()
            .map(|s| s.full_path)
            .collect()
    }

    #[test]
    fn attribute_leaves_join_with_pipe() {
        assert_eq!(paths("Base;Seg1;Seg2", false), vec!["Base|Seg1", "Base|Seg2"]);
    }

    #[test]
    fn point_leaves_join_with_backslash() {
        assert_eq!(
            paths("\\\\PISRV;sinusoid;cdt158", true),
            vec!["\\\\PISRV\\sinusoid", "\\\\PISRV\\cdt158"]
        );
    }

    #[test]
    fn labels_are_the_leaves() {
        let segs = expand("Base;Temp", false).unwrap();
        assert_eq!(segs[0].label, "Temp");
    }

    #[test]
    fn empty_leaves_are_skipped() {
        assert_eq!(paths("Base;A;;B;", false), vec!["Base|A", "Base|B"]);
        assert!(expand("Base;", false).unwrap().is_empty());
    }

    #[test]
    fn missing_separator_is_rejected() {
        assert!(matches!(
            expand("Base", false),
            Err(QueryError::InvalidTarget(_))
        ));
        assert!(matches!(
            expand(";Leaf", true),
            Err(QueryError::InvalidTarget(_))
        ));
    }
}
