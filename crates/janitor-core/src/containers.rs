//! Exited-container classification and builder sentinel protection.

use crate::collaborators::Container;

/// Name of the platform builder container.
pub const BUILDER_CONTAINER: &str = "/deis-builder";

/// Name of the builder's data-only companion container.
pub const BUILDER_DATA_CONTAINER: &str = "/deis-builder-data";

/// The two sentinel slots the classifier may fill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentinels {
    pub builder: Option<Container>,
    pub builder_data: Option<Container>,
}

impl Sentinels {
    /// Sentinels to remove: both of them, and only when the builder itself
    /// has exited. Build cache in the data container must outlive any
    /// builder that may still be running.
    pub fn removable(&self) -> Vec<&Container> {
        match &self.builder {
            Some(builder) => std::iter::once(builder)
                .chain(self.builder_data.as_ref())
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Containers split into ordinary ones and the builder sentinels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    pub ordinary: Vec<Container>,
    pub sentinels: Sentinels,
}

/// Splits container lists by sentinel name.
#[derive(Debug, Clone)]
pub struct ContainerClassifier {
    builder: String,
    builder_data: String,
}

impl ContainerClassifier {
    pub fn new(builder: impl Into<String>, builder_data: impl Into<String>) -> Self {
        Self {
            builder: builder.into(),
            builder_data: builder_data.into(),
        }
    }

    /// Partition `containers`, preserving input order for ordinary ones.
    ///
    /// If several containers carry the same sentinel name the last one wins.
    pub fn classify(&self, containers: Vec<Container>) -> Classified {
        let mut out = Classified::default();
        for container in containers {
            if container.has_name(&self.builder) {
                out.sentinels.builder = Some(container);
            } else if container.has_name(&self.builder_data) {
                out.sentinels.builder_data = Some(container);
            } else {
                out.ordinary.push(container);
            }
        }
        out
    }
}

impl Default for ContainerClassifier {
    fn default() -> Self {
        Self::new(BUILDER_CONTAINER, BUILDER_DATA_CONTAINER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exited(id: &str, name: &str) -> Container {
        Container::new(id, name, "Exited (0) 2 hours ago")
    }

    #[test]
    fn test_classify_splits_sentinels() {
        let classified = ContainerClassifier::default().classify(vec![
            exited("1", "/web_1"),
            exited("2", BUILDER_CONTAINER),
            exited("3", "/worker_1"),
            exited("4", BUILDER_DATA_CONTAINER),
        ]);
        let ids: Vec<_> = classified.ordinary.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(classified.sentinels.builder.unwrap().id, "2");
        assert_eq!(classified.sentinels.builder_data.unwrap().id, "4");
    }

    #[test]
    fn test_last_sentinel_wins() {
        let classified = ContainerClassifier::default()
            .classify(vec![exited("a", BUILDER_CONTAINER), exited("b", BUILDER_CONTAINER)]);
        assert_eq!(classified.sentinels.builder.unwrap().id, "b");
        assert!(classified.ordinary.is_empty());
    }

    #[test]
    fn test_sentinel_name_must_match_exactly() {
        let classified = ContainerClassifier::default()
            .classify(vec![exited("x", "/deis-builder-data-old")]);
        assert_eq!(classified.ordinary.len(), 1);
        assert_eq!(classified.sentinels, Sentinels::default());
    }

    #[test]
    fn test_data_alone_is_not_removable() {
        let sentinels = Sentinels {
            builder: None,
            builder_data: Some(exited("d", BUILDER_DATA_CONTAINER)),
        };
        assert!(sentinels.removable().is_empty());
    }

    #[test]
    fn test_exited_builder_takes_data_with_it() {
        let sentinels = Sentinels {
            builder: Some(exited("b", BUILDER_CONTAINER)),
            builder_data: Some(exited("d", BUILDER_DATA_CONTAINER)),
        };
        let ids: Vec<_> = sentinels.removable().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d"]);
    }

    #[test]
    fn test_exited_builder_without_data() {
        let sentinels = Sentinels {
            builder: Some(exited("b", BUILDER_CONTAINER)),
            builder_data: None,
        };
        assert_eq!(sentinels.removable().len(), 1);
    }
}
