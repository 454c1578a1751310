//! Built-in email templates and a minimal mustache-style renderer.
//!
//! Supported syntax is `{{name}}` substitution only. A required variable counts
//! as set when it is present and not blank. Unknown placeholders render as
//! empty strings.

use crate::email::{EmailError, TemplateVars};

pub const CANDIDATE_REJECTION: &str = "candidate-rejection";

#[derive(Debug)]
pub struct EmailTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub subject: &'static str,
    /// `<body>` onwards; the shared head is prepended at render time.
    pub html: &'static str,
    pub text: &'static str,
    pub required_variables: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <style>
    body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
    .container { max-width: 600px; margin: 0 auto; padding: 20px; }
    .content { background: #f9f9f9; padding: 20px; border-radius: 8px; }
    .footer { margin-top: 30px; font-size: 12px; color: #666; text-align: center; }
  </style>
</head>"#;

static TEMPLATES: &[EmailTemplate] = &[
    EmailTemplate {
        id: CANDIDATE_REJECTION,
        name: "Candidate Rejection",
        subject: "Update on your application for {{job_title}} at {{company_name}}",
        html: r#"<body>
  <div class="container">
    <div class="content">
      <h2>Thank you for your interest in {{company_name}}</h2>
      <p>Hi {{candidate_name}},</p>
      <p>Thank you for applying for the <strong>{{job_title}}</strong> position at {{company_name}}.</p>
      <p>After careful review we have decided to move forward with candidates whose experience more closely matches the current requirements of this role.</p>
      <p>We encourage you to apply for future openings that fit your skills, and we wish you the best in your search.</p>
      <p>Best regards,<br>The {{company_name}} Hiring Team</p>
    </div>
    <div class="footer">
      <p>This is an automated message about your job application (ID: {{application_id}}).</p>
      <p>Please do not reply to this email.</p>
    </div>
  </div>
</body>
</html>"#,
        text: "Thank you for your interest in {{company_name}}

Hi {{candidate_name}},

Thank you for applying for the {{job_title}} position at {{company_name}}.

After careful review we have decided to move forward with candidates whose experience more closely matches the current requirements of this role.

We encourage you to apply for future openings that fit your skills, and we wish you the best in your search.

Best regards,
The {{company_name}} Hiring Team

---
This is an automated message about your job application (ID: {{application_id}}).
Please do not reply to this email.",
        required_variables: &["candidate_name", "job_title", "company_name", "application_id"],
    },
];

pub fn find(template_id: &str) -> Option<&'static EmailTemplate> {
    TEMPLATES.iter().find(|t| t.id == template_id)
}

/// Validates required variables and renders subject, HTML and text bodies.
/// Values are HTML-escaped in the HTML body only.
pub fn render_email(template_id: &str, vars: &TemplateVars) -> Result<RenderedEmail, EmailError> {
    let template =
        find(template_id).ok_or_else(|| EmailError::UnknownTemplate(template_id.to_string()))?;

    if let Some(missing) = template
        .required_variables
        .iter()
        .find(|name| !is_set(vars, name))
    {
        return Err(EmailError::MissingVariable {
            template: template.id.to_string(),
            variable: missing.to_string(),
        });
    }

    let html = format!("{HTML_HEAD}\n{}", template.html);

    Ok(RenderedEmail {
        subject: render(template.subject, vars, false),
        html: render(&html, vars, true),
        text: render(template.text, vars, false),
    })
}

fn is_set(vars: &TemplateVars, name: &str) -> bool {
    vars.get(name).is_some_and(|value| !value.trim().is_empty())
}

fn render(source: &str, vars: &TemplateVars, escape: bool) -> String {
    substitute(source, vars, escape).trim().to_string()
}

fn substitute(source: &str, vars: &TemplateVars, escape: bool) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        if let Some(value) = vars.get(after[..end].trim()) {
            if escape {
                out.push_str(&escape_html(value));
            } else {
                out.push_str(value);
            }
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
