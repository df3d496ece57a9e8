use crate::colors::normalize_category;

/// A generated sidebar folder for one keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordFolder {
    pub keyword: String,
    pub display_name: String,
    /// Never computed client side; folders always show zero.
    pub count: usize,
}

impl KeywordFolder {
    fn new(keyword: &str) -> Self {
        Self {
            display_name: capitalize_first(keyword.trim()),
            keyword: normalize_category(keyword),
            count: 0,
        }
    }
}

/// Uppercases the first character and leaves the rest untouched.
fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The maintained set of defined categories (the showcase) plus the sidebar
/// keyword index. Rendering reads from here; nothing is parsed back out of
/// rendered output.
#[derive(Debug, Default)]
pub struct CategoryManager {
    categories: Vec<String>,
    folders: Vec<KeywordFolder>,
}

impl CategoryManager {
    pub fn new(initial: &[String]) -> Self {
        let mut manager = Self::default();
        for name in initial {
            manager.insert(name);
        }
        manager.refresh_sidebar_keywords(initial);
        manager
    }

    pub fn list_existing(&self) -> &[String] {
        &self.categories
    }

    pub fn contains(&self, name: &str) -> bool {
        let name = normalize_category(name);
        self.categories.iter().any(|c| *c == name)
    }

    /// Appends a normalized category; returns false for blanks and duplicates.
    pub fn insert(&mut self, name: &str) -> bool {
        let name = normalize_category(name);
        if name.is_empty() || self.contains(&name) {
            return false;
        }
        self.categories.push(name);
        true
    }

    /// Removes a category and returns its former position, for `restore`.
    pub fn remove(&mut self, name: &str) -> Option<usize> {
        let name = normalize_category(name);
        let index = self.categories.iter().position(|c| *c == name)?;
        self.categories.remove(index);
        Some(index)
    }

    pub fn restore(&mut self, name: &str, index: usize) {
        let name = normalize_category(name);
        if self.contains(&name) {
            return;
        }
        let index = index.min(self.categories.len());
        self.categories.insert(index, name);
    }

    /// Makes the showcase match an authoritative keyword list from the server,
    /// then rebuilds the sidebar from the same list.
    pub fn sync_existing(&mut self, keywords: &[String]) {
        self.categories.clear();
        for keyword in keywords {
            self.insert(keyword);
        }
        self.refresh_sidebar_keywords(keywords);
    }

    /// Replaces every generated folder with one per keyword, in the given order.
    pub fn refresh_sidebar_keywords(&mut self, keywords: &[String]) {
        self.folders = keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .map(|k| KeywordFolder::new(k))
            .collect();
    }

    pub fn folders(&self) -> &[KeywordFolder] {
        &self.folders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn seeds_showcase_and_sidebar() {
        let manager = CategoryManager::new(&keywords(&["networking", "Club Events"]));
        assert_eq!(manager.list_existing(), &["networking", "club events"]);
        let names: Vec<&str> = manager
            .folders()
            .iter()
            .map(|f| f.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["Networking", "Club Events"]);
        assert!(manager.folders().iter().all(|f| f.count == 0));
    }

    #[test]
    fn folder_names_keep_server_text_after_first_letter() {
        let manager = CategoryManager::new(&keywords(&[
            "c++ club",
            "ai/ml",
            "job-fair",
            "club events",
            "Research Lab",
            "\u{e9}cole",
        ]));
        let names: Vec<&str> = manager
            .folders()
            .iter()
            .map(|f| f.display_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["C++ club", "Ai/ml", "Job-fair", "Club events", "Research Lab", "\u{c9}cole"]
        );
        // Filtering still keys on the normalized name.
        assert_eq!(manager.folders()[4].keyword, "research lab");
    }

    #[test]
    fn sync_replaces_showcase_with_server_list() {
        let mut manager = CategoryManager::new(&keywords(&["networking", "internship"]));
        manager.sync_existing(&keywords(&["networking", "Hackathons", "networking"]));
        assert_eq!(manager.list_existing(), &["networking", "hackathons"]);
        assert_eq!(manager.folders()[1].display_name, "Hackathons");
    }

    #[test]
    fn existence_is_case_insensitive() {
        let mut manager = CategoryManager::default();
        assert!(manager.insert("Networking"));
        assert!(manager.contains(" NETWORKING "));
        assert!(!manager.insert("networking"));
        assert!(!manager.insert("   "));
        assert_eq!(manager.list_existing().len(), 1);
    }

    #[test]
    fn restore_puts_category_back_in_place() {
        let mut manager = CategoryManager::new(&keywords(&["a", "b", "c"]));
        let index = manager.remove("B").unwrap();
        assert_eq!(index, 1);
        assert_eq!(manager.list_existing(), &["a", "c"]);
        manager.restore("b", index);
        assert_eq!(manager.list_existing(), &["a", "b", "c"]);
    }

    #[test]
    fn sidebar_follows_server_order_and_drops_old_folders() {
        let mut manager = CategoryManager::new(&keywords(&["networking", "internship"]));
        manager.refresh_sidebar_keywords(&keywords(&["research", "networking"]));
        let folders: Vec<&str> = manager
            .folders()
            .iter()
            .map(|f| f.keyword.as_str())
            .collect();
        assert_eq!(folders, vec!["research", "networking"]);
        // The showcase is not rebuilt from the sidebar list.
        assert_eq!(manager.list_existing(), &["networking", "internship"]);
    }
}
