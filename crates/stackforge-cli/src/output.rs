//! Formatted output helpers for CLI commands.

use stackforge_common::constants::MAX_INLINE_TEMPLATE_BYTES;

/// Formats a byte count into a human-readable string (e.g., "12.5 KiB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;

    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Size column for a template, flagged when it is too large to deploy inline.
#[must_use]
pub fn template_size(bytes: u64) -> String {
    if bytes > MAX_INLINE_TEMPLATE_BYTES {
        format!("{} (exceeds inline limit, upload required)", format_bytes(bytes))
    } else {
        format_bytes(bytes)
    }
}

/// A title underlined with a double rule of the same width.
#[must_use]
pub fn heading(title: &str) -> String {
    format!("{title}\n{}", "\u{2550}".repeat(title.chars().count()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_displays_bytes() {
        assert_eq!(format_bytes(512), "512 B");
    }

    #[test]
    fn format_bytes_displays_kib() {
        assert_eq!(format_bytes(2048), "2.0 KiB");
    }

    #[test]
    fn format_bytes_displays_mib() {
        assert_eq!(format_bytes(3_145_728), "3.0 MiB");
    }

    #[test]
    fn template_size_flags_large_bodies() {
        assert_eq!(template_size(51_200), "50.0 KiB");
        assert!(template_size(51_201).contains("upload required"));
    }

    #[test]
    fn heading_rule_matches_title_width() {
        assert_eq!(heading("Plan"), "Plan\n\u{2550}\u{2550}\u{2550}\u{2550}");
    }
}
