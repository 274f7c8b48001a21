use super::AddressBar;

/// A path plus optional fragment, standing in for the browser address bar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    path: String,
    fragment: Option<String>,
}

impl Location {
    /// Splits `raw` at the first `#`. An empty fragment counts as absent.
    pub fn parse(raw: &str) -> Self {
        let (path, fragment) = match raw.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment)),
            None => (raw, None),
        };
        Self {
            path: if path.is_empty() { "/" } else { path }.to_string(),
            fragment: fragment.filter(|f| !f.is_empty()).map(ToString::to_string),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last non-empty path segment read as a 1-based clan index.
    pub fn clan_index(&self) -> Option<usize> {
        self.path
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .and_then(|segment| segment.parse::<usize>().ok())
            .filter(|index| *index > 0)
    }
}

impl AddressBar for Location {
    fn href(&self) -> String {
        match &self.fragment {
            Some(fragment) => format!("{}#{fragment}", self.path),
            None => self.path.clone(),
        }
    }

    fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    fn replace_fragment(&mut self, fragment: Option<&str>) {
        self.fragment = fragment.filter(|f| !f.is_empty()).map(ToString::to_string);
    }
}
