use crate::models::{DashboardStats, Invoice};

/// One system + user exchange sent to the model
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.2,
            max_tokens: 1024,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

// ============================================================================
// SYSTEM PROMPTS
// ============================================================================

const PARSE_INVOICE_SYSTEM: &str = r#"You are an assistant that extracts invoice data from free text.
Respond ONLY with a JSON object, no markdown and no explanations, with this exact shape:
{
  "clientName": "string",
  "email": "string or null",
  "address": "string or null",
  "items": [{ "name": "string", "quantity": number, "unitPrice": number }]
}
Use null for anything the text does not mention. Quantities default to 1."#;

const REMINDER_SYSTEM: &str = "You write short, friendly and professional payment reminder e-mails. \
Return only the e-mail body as plain text.";

const INSIGHTS_SYSTEM: &str = r#"You are a financial analyst for a small business.
Given invoice statistics, give 2 or 3 short, actionable insights.
Respond ONLY with a JSON array of strings, for example ["insight one", "insight two"]."#;

// ============================================================================
// BUILDERS
// ============================================================================

pub fn parse_invoice(text: &str) -> Prompt {
    Prompt::new(PARSE_INVOICE_SYSTEM, format!("Text: {}", text.trim()))
        .temperature(0.0)
        .max_tokens(1500)
}

pub fn payment_reminder(invoice: &Invoice, sender: &str) -> Prompt {
    let due = invoice
        .due_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "not specified".to_string());

    let user = format!(
        "Write a polite payment reminder to {client} for invoice {number}.\n\
         Amount due: {amount}\n\
         Due date: {due}\n\
         Status: {status}\n\
         Sign it as {sender}.",
        client = invoice.client,
        number = invoice.invoice_number,
        amount = invoice.amount,
        status = invoice.status.as_str(),
    );

    Prompt::new(REMINDER_SYSTEM, user).temperature(0.7).max_tokens(600)
}

pub fn dashboard_insights(stats: &DashboardStats, recent: &[Invoice]) -> Prompt {
    let mut user = format!(
        "Total invoices: {}\nPaid invoices: {}\nUnpaid invoices: {}\n\
         Total revenue collected: {}\nTotal outstanding: {}\n",
        stats.total_invoices,
        stats.paid_invoices,
        stats.unpaid_invoices,
        stats.total_revenue,
        stats.total_outstanding,
    );

    if !recent.is_empty() {
        user.push_str("Recent invoices:\n");
        for invoice in recent {
            user.push_str(&format!(
                "- {} for {}: {} ({})\n",
                invoice.invoice_number,
                invoice.client,
                invoice.amount,
                invoice.status.as_str()
            ));
        }
    }

    Prompt::new(INSIGHTS_SYSTEM, user).temperature(0.5).max_tokens(500)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_invoice_prompt_is_deterministic() {
        let prompt = parse_invoice("  bill Acme 3 hours at $50  ");
        assert_eq!(prompt.temperature, 0.0);
        assert_eq!(prompt.user, "Text: bill Acme 3 hours at $50");
        assert!(prompt.system.contains("clientName"));
    }

    #[test]
    fn test_insights_prompt_lists_stats() {
        let stats = DashboardStats::from_invoices(&[]);
        let prompt = dashboard_insights(&stats, &[]);
        assert!(prompt.user.contains("Total invoices: 0"));
        assert!(!prompt.user.contains("Recent invoices"));
    }
}
