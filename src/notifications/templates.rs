use crate::error::Result;
use serde::Serialize;
use tera::{Context, Tera};

pub const RECEIPT: &str = "receipt.txt";
pub const ANSWER: &str = "answer.txt";

const RECEIPT_TEMPLATE: &str = r#"Hello {{ recipient }},

Your request "{{ title }}" has been received. It is registered as ticket {{ reference }}
in {{ organization }} and will be handled as soon as possible.
{% if content %}
Your message:

{{ content }}
{% endif %}
You can add information to the ticket by answering this email.
Please keep {{ reference }} in the subject.
"#;

const ANSWER_TEMPLATE: &str = r#"Hello {{ recipient }},

{{ author }} answered ticket {{ reference }} "{{ title }}"{% if confidential %} (confidential){% endif %}:

{{ content }}

Status: {{ status }}

Answer this email to reply. Please keep {{ reference }} in the subject.
"#;

/// Values available to the templates
#[derive(Debug, Serialize)]
pub struct TemplateData<'a> {
    pub recipient: &'a str,
    pub author: &'a str,
    pub reference: String,
    pub title: &'a str,
    pub organization: &'a str,
    pub status: String,
    pub content: &'a str,
    pub confidential: bool,
}

/// Mail templates, compiled once
pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![(RECEIPT, RECEIPT_TEMPLATE), (ANSWER, ANSWER_TEMPLATE)])?;
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, data: &TemplateData<'_>) -> Result<String> {
        let context = Context::from_serialize(data)?;
        Ok(self.tera.render(name, &context)?)
    }
}
