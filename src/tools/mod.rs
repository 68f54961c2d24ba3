//! Agent tools — named callables the agent can select during a turn.
//!
//! Each tool carries a natural-language description that guides selection;
//! the agent never sees tool internals, only name + description + output.
//! Enum dispatch mirrors the `LlmProvider` pattern: a new tool is a new
//! module + variant + `run` arm.

pub mod hospital;
pub mod search;

use crate::error::AppError;

/// A tool exposed to the agent.
pub struct Tool {
    name: &'static str,
    description: String,
    /// When set, the tool's output is returned to the user as-is instead of
    /// being fed back into the loop as an observation.
    return_direct: bool,
    kind: ToolKind,
}

enum ToolKind {
    WebSearch(search::WebSearch),
    HospitalLookup(hospital::HospitalLookup),
}

impl Tool {
    pub fn web_search(executor: search::WebSearch) -> Self {
        Self {
            name: "web_search",
            description: "Search the web for current information. Useful when the question \
                          needs facts the other tools cannot provide, such as recent medical \
                          news or services outside the region. The input is a plain search query."
                .to_string(),
            return_direct: false,
            kind: ToolKind::WebSearch(executor),
        }
    }

    pub fn hospital_lookup(executor: hospital::HospitalLookup) -> Self {
        Self {
            name: "hospital_directory",
            description: "Useful for when you want to answer questions about the hospitals \
                          and its contact number around chitwon city. The input to this tool \
                          should be a complete english sentence."
                .to_string(),
            return_direct: true,
            kind: ToolKind::HospitalLookup(executor),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn return_direct(&self) -> bool {
        self.return_direct
    }

    /// Execute the tool against `input`.
    pub async fn run(&self, input: &str) -> Result<String, AppError> {
        match &self.kind {
            ToolKind::WebSearch(t) => t.run(input).await,
            ToolKind::HospitalLookup(t) => t.answer(input).await,
        }
    }
}

/// The set of tools available to one agent.
#[derive(Default)]
pub struct ToolSet {
    tools: Vec<Tool>,
}

impl ToolSet {
    pub fn new(tools: Vec<Tool>) -> Self {
        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name).collect()
    }

    /// Render the tool list for the system prompt, one `> name: description`
    /// line per tool.
    pub fn render_descriptions(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("> {}: {}", t.name, t.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::directory::HospitalDirectory;
    use crate::llm::LlmProvider;
    use crate::llm::providers::dummy::DummyProvider;

    fn sample_set() -> ToolSet {
        let directory = Arc::new(HospitalDirectory::open_seeded().unwrap());
        let lookup =
            hospital::HospitalLookup::new(directory, LlmProvider::Dummy(DummyProvider));
        ToolSet::new(vec![Tool::hospital_lookup(lookup)])
    }

    #[test]
    fn get_by_name() {
        let set = sample_set();
        assert!(set.get("hospital_directory").is_some());
        assert!(set.get("missing_tool").is_none());
    }

    #[test]
    fn hospital_tool_returns_direct() {
        let set = sample_set();
        assert!(set.get("hospital_directory").unwrap().return_direct());
    }

    #[test]
    fn descriptions_render_one_line_per_tool() {
        let set = sample_set();
        let rendered = set.render_descriptions();
        assert!(rendered.starts_with("> hospital_directory:"));
        assert!(rendered.contains("chitwon city"));
    }
}
