/// Read-only snapshot of the Jira fields a generation request needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketContext {
    pub id: String,
    pub key: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub workflow_notes: Option<String>,
    pub acceptance_criteria: Option<String>,
}

impl TicketContext {
    /// Returns the field's text, treating empty and whitespace-only values as absent.
    pub fn field(&self, field: TicketField) -> Option<&str> {
        let value = match field {
            TicketField::Summary => self.summary.as_deref(),
            TicketField::Description => self.description.as_deref(),
            TicketField::Workflow => self.workflow_notes.as_deref(),
            TicketField::AcceptanceCriteria => self.acceptance_criteria.as_deref(),
        };
        value.filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketField {
    Summary,
    Description,
    Workflow,
    AcceptanceCriteria,
}

impl TicketField {
    pub const ALL: [TicketField; 4] = [
        TicketField::Summary,
        TicketField::Description,
        TicketField::Workflow,
        TicketField::AcceptanceCriteria,
    ];

    /// Name used inside `{{...}}` template placeholders.
    pub fn placeholder(&self) -> &'static str {
        match self {
            TicketField::Summary => "summary",
            TicketField::Description => "description",
            TicketField::Workflow => "workflow",
            TicketField::AcceptanceCriteria => "ac",
        }
    }

    pub fn from_placeholder(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.placeholder() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_read_as_absent() {
        let ticket = TicketContext {
            key: "QA-1".to_string(),
            summary: Some("  ".to_string()),
            description: Some("Login page".to_string()),
            ..Default::default()
        };
        assert_eq!(ticket.field(TicketField::Summary), None);
        assert_eq!(ticket.field(TicketField::Description), Some("Login page"));
        assert_eq!(ticket.field(TicketField::Workflow), None);
    }

    #[test]
    fn maps_placeholder_names() {
        assert_eq!(
            TicketField::from_placeholder("ac"),
            Some(TicketField::AcceptanceCriteria)
        );
        assert_eq!(TicketField::from_placeholder("user_prompt"), None);
    }
}
