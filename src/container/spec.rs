use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_tag() -> String {
    "latest".to_string()
}

/// Immutable description of a service to launch.
///
/// `name` identifies the service inside a [`Registry`](crate::Registry) and
/// doubles as the container name, so a re-run purges the previous instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    pub image: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Overrides the image's default command when non-empty.
    #[serde(default)]
    pub cmd: Vec<String>,
    /// Container ports to publish. Empty publishes every port the image exposes.
    #[serde(default)]
    pub ports: Vec<String>,
}

impl ServiceSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            tag: default_tag(),
            env: BTreeMap::new(),
            cmd: Vec::new(),
            ports: Vec::new(),
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn cmd<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmd = cmd.into_iter().map(Into::into).collect();
        self
    }

    pub fn expose(mut self, port: impl Into<String>) -> Self {
        self.ports.push(port.into());
        self
    }

    /// `image:tag` reference passed to the engine.
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }
}
