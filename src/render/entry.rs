use crate::spec::{Bounds, SpecEntry, ValueType, format_number};

/// One line per entry:
/// `name  version  type [bounds]  aliases: ..  modulates: ..`
pub fn render_entry(entry: &SpecEntry) -> String {
    let mut line = format!(
        "{:<28} {:<12} {}",
        entry.name,
        entry.version.map_or("-", |v| v.as_str()),
        describe_type(&entry.value_type, entry.bounds)
    );
    if !entry.aliases.is_empty() {
        line.push_str("  aliases: ");
        line.push_str(&entry.aliases.join(", "));
    }
    if let Some(target) = &entry.modulates {
        line.push_str("  modulates: ");
        line.push_str(target);
    }
    line
}

fn describe_type(value_type: &ValueType, bounds: Bounds) -> String {
    match value_type {
        ValueType::Enum(options) => format!("enum [{}]", options.join(", ")),
        other => match (bounds.min, bounds.max) {
            (Some(min), Some(max)) => format!(
                "{} {} to {}",
                other.name(),
                format_number(min),
                format_number(max)
            ),
            (Some(min), None) => format!("{} >= {}", other.name(), format_number(min)),
            (None, Some(max)) => format!("{} <= {}", other.name(), format_number(max)),
            (None, None) => other.name().to_string(),
        },
    }
}
