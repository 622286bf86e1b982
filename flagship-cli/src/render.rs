use flagship_lib::FeatureFlag;

pub fn status(flag: &FeatureFlag) -> &'static str {
    if flag.enabled {
        "ENABLED"
    } else {
        "DISABLED"
    }
}

pub fn value(flag: &FeatureFlag) -> &str {
    match flag.value.as_deref() {
        None => "(null)",
        Some("") => "(empty string)",
        Some(v) => v,
    }
}

/// One line per flag: key, type, status and value.
pub fn row(flag: &FeatureFlag, show_description: bool) -> String {
    let mut line = format!(
        "{:<32} {:<7} {:<8} {}",
        flag.key,
        flag.flag_type.as_str(),
        status(flag),
        value(flag)
    );
    if show_description {
        if let Some(ref desc) = flag.description {
            line.push_str(&format!(" ({})", desc));
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use flagship_lib::FlagType;

    #[test]
    fn test_value_placeholders() {
        let flag = FeatureFlag::new("a", FlagType::String, true);
        assert_eq!(value(&flag), "(null)");
        assert_eq!(value(&flag.clone().with_value("")), "(empty string)");
        assert_eq!(value(&flag.with_value("blue")), "blue");
    }

    #[test]
    fn test_row_layout() {
        let flag = FeatureFlag::new("checkout", FlagType::Boolean, false)
            .with_description("New checkout flow");

        let line = row(&flag, false);
        assert!(line.starts_with("checkout "));
        assert!(line.contains(" BOOLEAN "));
        assert!(line.contains(" DISABLED "));
        assert!(line.ends_with("(null)"));

        assert!(row(&flag, true).ends_with("(null) (New checkout flow)"));
    }
}
