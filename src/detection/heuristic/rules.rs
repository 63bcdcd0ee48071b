//! Extension and location rule sets used by the heuristic checks.

use crate::core::config::DetectionConfig;
use std::collections::HashSet;
use std::path::Path;

/// Normalized rule sets (lowercase, no leading dot).
#[derive(Debug, Clone)]
pub struct HeuristicRules {
    dangerous: HashSet<String>,
    spoofed: HashSet<String>,
    scripts: HashSet<String>,
    locations: Vec<String>,
}

impl Default for HeuristicRules {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

impl HeuristicRules {
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            dangerous: normalize_set(&config.dangerous_extensions),
            spoofed: normalize_set(&config.spoofed_extensions),
            scripts: normalize_set(&config.script_extensions),
            locations: config
                .suspicious_locations
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn is_dangerous(&self, ext: &str) -> bool {
        self.dangerous.contains(ext)
    }

    pub fn is_spoofed(&self, ext: &str) -> bool {
        self.spoofed.contains(ext)
    }

    pub fn is_script(&self, ext: &str) -> bool {
        self.scripts.contains(ext)
    }

    /// First location keyword contained in the path, if any.
    pub fn suspicious_location(&self, path: &Path) -> Option<&str> {
        let haystack = path.to_string_lossy().to_lowercase();
        self.locations
            .iter()
            .find(|keyword| haystack.contains(keyword.as_str()))
            .map(|k| k.as_str())
    }
}

fn normalize_set(items: &[String]) -> HashSet<String> {
    items
        .iter()
        .map(|s| normalize_extension(s))
        .filter(|s| !s.is_empty())
        .collect()
}

/// ".EXE" -> "exe"
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Final extension of a path, normalized. A leading dot counts, so ".js" is "js".
pub fn final_extension(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    split_extension(&name).map(|(_, ext)| ext)
}

/// Extension of the name with its final extension removed ("a.pdf.exe" -> "pdf").
pub fn inner_extension(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let (rest, _) = split_extension(&name)?;
    split_extension(rest).map(|(_, ext)| ext)
}

fn split_extension(name: &str) -> Option<(&str, String)> {
    let (rest, ext) = name.rsplit_once('.')?;
    let ext = normalize_extension(ext);
    if ext.is_empty() {
        return None;
    }
    Some((rest, ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_helpers() {
        let path = Path::new("/home/user/Invoice.PDF.exe");
        assert_eq!(final_extension(path).as_deref(), Some("exe"));
        assert_eq!(inner_extension(path).as_deref(), Some("pdf"));

        let path = Path::new("report.exe");
        assert_eq!(inner_extension(path), None);
        assert_eq!(final_extension(Path::new("Makefile")), None);
        assert_eq!(final_extension(Path::new("trailing.")), None);
    }

    #[test]
    fn test_leading_dot_names() {
        assert_eq!(final_extension(Path::new("/tmp/.js")).as_deref(), Some("js"));
        assert_eq!(inner_extension(Path::new("/tmp/.js")), None);

        let path = Path::new("/home/user/.pdf.exe");
        assert_eq!(final_extension(path).as_deref(), Some("exe"));
        assert_eq!(inner_extension(path).as_deref(), Some("pdf"));
    }

    #[test]
    fn test_default_rules() {
        let rules = HeuristicRules::default();
        assert!(rules.is_dangerous("exe"));
        assert!(rules.is_dangerous("dll"));
        assert!(rules.is_spoofed("pdf"));
        assert!(rules.is_script("ps1"));
        assert!(!rules.is_script("exe"));
    }

    #[test]
    fn test_custom_rules_are_normalized() {
        let config = DetectionConfig {
            dangerous_extensions: vec![".APK".to_string()],
            suspicious_locations: vec!["  Cache ".to_string()],
            ..DetectionConfig::default()
        };
        let rules = HeuristicRules::from_config(&config);
        assert!(rules.is_dangerous("apk"));
        assert!(!rules.is_dangerous("exe"));
        assert_eq!(
            rules.suspicious_location(Path::new("/var/CACHE/x.bin")),
            Some("cache")
        );
    }

    #[test]
    fn test_first_location_wins() {
        let rules = HeuristicRules::default();
        let hit = rules.suspicious_location(Path::new("C:/Users/a/AppData/Local/Temp/x.exe"));
        assert_eq!(hit, Some("temp"));
        assert_eq!(rules.suspicious_location(Path::new("/srv/data/file.txt")), None);
    }
}
