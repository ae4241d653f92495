use std::fmt;

use serde::{Serialize, Serializer};

/// Content category assigned to a search keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Action,
    Romance,
    Comedy,
    Horror,
    Animation,
    Drama,
    CDrama,
    KDrama,
    Sports,
    Music,
    RealityShow,
    TvChannel,
    News,
    Other,
}

impl Category {
    pub const ALL: [Category; 14] = [
        Category::Action,
        Category::Romance,
        Category::Comedy,
        Category::Horror,
        Category::Animation,
        Category::Drama,
        Category::CDrama,
        Category::KDrama,
        Category::Sports,
        Category::Music,
        Category::RealityShow,
        Category::TvChannel,
        Category::News,
        Category::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Action => "Action",
            Category::Romance => "Romance",
            Category::Comedy => "Comedy",
            Category::Horror => "Horror",
            Category::Animation => "Animation",
            Category::Drama => "Drama",
            Category::CDrama => "C Drama",
            Category::KDrama => "K Drama",
            Category::Sports => "Sports",
            Category::Music => "Music",
            Category::RealityShow => "Reality Show",
            Category::TvChannel => "TV Channel",
            Category::News => "News",
            Category::Other => "Other",
        }
    }

    /// Parse a label produced by the classification service.
    ///
    /// Matching ignores case and repeated or surrounding whitespace. A compound
    /// answer such as `"Drama / Fantasy"` resolves through its first part.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = normalize(label);
        let exact = Self::ALL
            .into_iter()
            .find(|c| normalize(c.label()) == wanted);

        exact.or_else(|| {
            let (head, _) = label.split_once('/')?;
            let head = normalize(head);
            Self::ALL.into_iter().find(|c| normalize(c.label()) == head)
        })
    }

    /// Like [`Category::from_label`], falling back to [`Category::Other`].
    pub fn resolve(label: &str) -> Self {
        Self::from_label(label).unwrap_or(Category::Other)
    }
}

fn normalize(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}
