use crate::document::InvoiceData;
use anyhow::{Result, bail};
use itertools::Itertools;
use std::fmt;

/// Something that keeps an invoice from being issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    Missing(&'static str),
    /// A NUIT is nine digits, spaces and punctuation aside.
    BadTaxId { party: &'static str, value: String },
    NoBillableItems,
    DueBeforeIssue,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::Missing(field) => write!(f, "{} is required", field),
            Problem::BadTaxId { party, value } => {
                write!(f, "{} NUIT '{}' must be exactly 9 digits", party, value)
            }
            Problem::NoBillableItems => write!(f, "At least one item with a description and quantity is required"),
            Problem::DueBeforeIssue => write!(f, "Due date is before the issue date"),
        }
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn tax_id_problem(party: &'static str, value: &str) -> Option<Problem> {
    let digits = value.chars().filter(char::is_ascii_digit).count();
    let other = value
        .chars()
        .any(|c| !c.is_ascii_digit() && !c.is_whitespace() && c != '-' && c != '.');
    (digits != 9 || other).then(|| Problem::BadTaxId {
        party,
        value: value.trim().to_owned(),
    })
}

/// Every problem with the invoice, in form order. Empty when it can be issued.
pub fn validate(data: &InvoiceData) -> Vec<Problem> {
    let mut problems = Vec::new();
    if data.invoice.number.as_deref().is_none_or(blank) {
        problems.push(Problem::Missing("Invoice number"));
    }
    if data.invoice.issue_date.is_none() {
        problems.push(Problem::Missing("Issue date"));
    }
    let parties = [
        (&data.company, "Company", "Company name", "Company NUIT"),
        (&data.client, "Client", "Client name", "Client NUIT"),
    ];
    for (party, who, name, tax_id) in parties {
        if blank(&party.name) {
            problems.push(Problem::Missing(name));
        }
        if blank(&party.tax_id) {
            problems.push(Problem::Missing(tax_id));
        } else if let Some(problem) = tax_id_problem(who, &party.tax_id) {
            problems.push(problem);
        }
    }
    if !data.items.iter().any(|item| item.is_billable()) {
        problems.push(Problem::NoBillableItems);
    }
    if let (Some(issued), Some(due)) = (data.invoice.issue_date, data.invoice.due_date) {
        if due < issued {
            problems.push(Problem::DueBeforeIssue);
        }
    }
    problems
}

/// `validate` as a single error listing every problem.
pub fn check(data: &InvoiceData) -> Result<()> {
    let problems = validate(data);
    if !problems.is_empty() {
        bail!("Invoice cannot be issued:\n{}", problems.iter().map(|p| format!("  - {}", p)).join("\n"));
    }
    Ok(())
}

#[cfg(test)]
mod validation_tests {
    use super::*;
    use crate::document::raw::Invoice;
    use crate::settings::Settings;
    use indoc::indoc;

    fn data(doc: &str) -> Result<InvoiceData> {
        Ok(doc.parse::<Invoice>()?.into_data(&Settings::default()))
    }

    #[test]
    fn complete_invoice_passes() -> Result<()> {
        let data = data(indoc! {"
            number: INV-2024-0001
            issue_date: 2024-03-20
            due_date: 2024-04-20
            company: {name: 'Walaka Software, Lda', nuit: '401 883 155'}
            client: {name: Sample Client, nuit: '123456789'}
            items:
              - {description: Sample Product 1, quantity: 2, unit_price: 500}
        "})?;
        assert_eq!(validate(&data), vec![]);
        check(&data)?;
        Ok(())
    }

    #[test]
    fn lists_everything_missing() -> Result<()> {
        let data = data(indoc! {"
            number: ' '
            items:
              - {description: '', quantity: 2, unit_price: 500}
              - {description: Nothing, quantity: 0, unit_price: 500}
        "})?;
        let problems = dbg!(validate(&data));
        assert_eq!(
            problems,
            vec![
                Problem::Missing("Invoice number"),
                Problem::Missing("Issue date"),
                Problem::Missing("Company name"),
                Problem::Missing("Company NUIT"),
                Problem::Missing("Client name"),
                Problem::Missing("Client NUIT"),
                Problem::NoBillableItems,
            ]
        );
        let err = check(&data).unwrap_err().to_string();
        assert!(err.contains("  - Client NUIT is required"));
        Ok(())
    }

    #[test]
    fn dates_and_tax_ids() -> Result<()> {
        let data = data(indoc! {"
            number: INV-2024-0002
            issue_date: 2024-03-20
            due_date: 2024-03-19
            company: {name: Walaka, nuit: '40188315'}
            client: {name: Client, nuit: 'ABC123456789'}
            items: [{description: Work, quantity: 1, unit_price: 10}]
        "})?;
        assert_eq!(
            validate(&data),
            vec![
                Problem::BadTaxId {
                    party: "Company",
                    value: "40188315".into()
                },
                Problem::BadTaxId {
                    party: "Client",
                    value: "ABC123456789".into()
                },
                Problem::DueBeforeIssue,
            ]
        );
        Ok(())
    }
}
