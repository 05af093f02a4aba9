use std::path::Path;

/// File formats with a specialized key-value extraction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Unstructured text, compared line by line
    PlainText,
    /// JSON documents
    Json,
    /// Property-list XML
    Plist,
    /// Flat `key = value` formats (properties, env, ini and friends)
    Properties,
}

impl FileFormat {
    /// Detect the format for a path, sniffing content when the file
    /// has no extension
    pub fn detect(path: &str, old_text: &str, new_text: &str) -> Self {
        let name = Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(path);
        if name == ".env" || name.starts_with(".env.") {
            return FileFormat::Properties;
        }

        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("json") => FileFormat::Json,
            Some("plist") => FileFormat::Plist,
            Some("properties") | Some("env") | Some("ini") | Some("cfg") | Some("conf") => {
                FileFormat::Properties
            }
            Some(_) => FileFormat::PlainText,
            None => {
                let sample = if new_text.is_empty() {
                    old_text
                } else {
                    new_text
                };
                if looks_like_plist(sample) {
                    FileFormat::Plist
                } else {
                    FileFormat::PlainText
                }
            }
        }
    }
}

fn looks_like_plist(text: &str) -> bool {
    text.lines().take(5).any(|line| {
        let line = line.trim_start();
        line.starts_with("<plist") || line.starts_with("<!DOCTYPE plist")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_by_extension() {
        assert_eq!(FileFormat::detect("config.json", "", ""), FileFormat::Json);
        assert_eq!(FileFormat::detect("Info.plist", "", ""), FileFormat::Plist);
        assert_eq!(
            FileFormat::detect("app.properties", "", ""),
            FileFormat::Properties
        );
        assert_eq!(FileFormat::detect("setup.cfg", "", ""), FileFormat::Properties);
        assert_eq!(FileFormat::detect("notes.txt", "", ""), FileFormat::PlainText);
        assert_eq!(FileFormat::detect("src/main.rs", "", ""), FileFormat::PlainText);
    }

    #[test]
    fn test_env_files_are_properties() {
        assert_eq!(FileFormat::detect(".env", "", ""), FileFormat::Properties);
        assert_eq!(
            FileFormat::detect("deploy/.env.production", "", ""),
            FileFormat::Properties
        );
    }

    #[test]
    fn test_extension_free_plists_are_sniffed() {
        let plist = "<?xml version=\"1.0\"?>\n<plist version=\"1.0\">\n<dict/>\n</plist>\n";
        assert_eq!(FileFormat::detect("Preferences", plist, plist), FileFormat::Plist);
        assert_eq!(
            FileFormat::detect("Preferences", "just text", "just text"),
            FileFormat::PlainText
        );
    }

    #[test]
    fn test_sniffing_falls_back_to_old_content_for_deletions() {
        let plist = "<plist version=\"1.0\"><dict/></plist>";
        assert_eq!(FileFormat::detect("Settings", plist, ""), FileFormat::Plist);
    }

    #[test]
    fn test_case_insensitive_extensions() {
        assert_eq!(FileFormat::detect("Config.JSON", "", ""), FileFormat::Json);
    }
}
