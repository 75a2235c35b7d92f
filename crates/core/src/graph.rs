use crate::error::GraphError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Graph and policy names end up in URLs and index names, so the service
/// only accepts identifier-shaped strings.
const NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_-]*$";

/// One stage of an extraction graph: an extractor to run, a stage name that
/// is unique within the graph, extractor-specific parameters, and optionally
/// the name of the stage whose output this one consumes. A policy without a
/// `content_source` reads the raw document uploaded to the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionPolicy {
    pub extractor: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub input_params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_source: Option<String>,
}

/// A named, declarative pipeline of extractor stages. The `content_source`
/// references between policies form the data-flow edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionGraph {
    pub name: String,
    #[serde(default)]
    pub extraction_policies: Vec<ExtractionPolicy>,
}

impl ExtractionGraph {
    /// Parses the declarative YAML document and validates the structure
    /// before it is ever sent to the service.
    pub fn from_yaml(spec: &str) -> Result<Self, GraphError> {
        let graph: ExtractionGraph = serde_yaml::from_str(spec)?;
        graph.validate()?;
        Ok(graph)
    }

    pub fn to_yaml(&self) -> Result<String, GraphError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Structural invariants: identifier-shaped names, unique policy names,
    /// and every `content_source` referencing a policy defined earlier in
    /// the sequence. Earlier-only references keep the graph acyclic without
    /// a separate cycle check.
    pub fn validate(&self) -> Result<(), GraphError> {
        let name_re = Regex::new(NAME_PATTERN)?;

        if !name_re.is_match(&self.name) {
            return Err(GraphError::InvalidGraphName(self.name.clone()));
        }

        let mut defined: Vec<&str> = Vec::with_capacity(self.extraction_policies.len());
        for policy in &self.extraction_policies {
            if !name_re.is_match(&policy.name) {
                return Err(GraphError::InvalidPolicyName(policy.name.clone()));
            }
            if policy.extractor.trim().is_empty() {
                return Err(GraphError::MissingExtractor(policy.name.clone()));
            }
            if defined.contains(&policy.name.as_str()) {
                return Err(GraphError::DuplicatePolicy(policy.name.clone()));
            }

            if let Some(source) = &policy.content_source {
                if source == &policy.name {
                    return Err(GraphError::SelfReference(policy.name.clone()));
                }
                if !defined.contains(&source.as_str()) {
                    return Err(GraphError::UnknownContentSource {
                        policy: policy.name.clone(),
                        source: source.clone(),
                    });
                }
            }

            defined.push(policy.name.as_str());
        }

        Ok(())
    }

    pub fn policy(&self, name: &str) -> Option<&ExtractionPolicy> {
        self.extraction_policies
            .iter()
            .find(|policy| policy.name == name)
    }

    /// Policies that consume the raw document rather than another stage.
    pub fn root_policies(&self) -> Vec<&ExtractionPolicy> {
        self.extraction_policies
            .iter()
            .filter(|policy| policy.content_source.is_none())
            .collect()
    }

    /// Policies that consume the output of `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<&ExtractionPolicy> {
        self.extraction_policies
            .iter()
            .filter(|policy| policy.content_source.as_deref() == Some(name))
            .collect()
    }
}
