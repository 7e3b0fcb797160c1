//! Commercial document contracts
//!
//! Orders, invoices and bills arrive as JSON objects whose keys depend on the
//! [`DocumentKind`]: `so_number`/`customer_id`/`order_date` for a sales order,
//! `bill_number`/`vendor_id`/`bill_date`/`due_date` for a vendor bill, and so
//! on. The contracts read those keys straight from the object so the handlers
//! stay generic over the kind.
//!
//! Errors for nested lines are keyed by position, e.g. `lines[1].quantity`.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use pl_core::dates::parse_optional_date;
use pl_core::{DocumentKind, Id, ValidationErrors};
use pl_db::{CreateDocumentDto, NewLineDto, UpdateDocumentDto, UpdateLineDto};

use crate::base::{finish, Contract, ValidationResult};

/// JSON request body of a document endpoint
pub type DocumentParams = Map<String, Value>;

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_STATUS: &str = "draft";

fn text(errors: &mut ValidationErrors, map: &DocumentParams, key: &str, field: &str) -> Option<String> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()).filter(|s| !s.trim().is_empty()),
        Some(_) => {
            errors.add(field, "must be a string");
            None
        }
    }
}

fn number(errors: &mut ValidationErrors, map: &DocumentParams, key: &str, field: &str) -> Option<f64> {
    let parsed = match map.get(key) {
        None | Some(Value::Null) => return None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(v) if v.is_finite() && v >= 0.0 => Some(v),
        _ => {
            errors.add(field, "must be a non-negative number");
            None
        }
    }
}

fn id(errors: &mut ValidationErrors, map: &DocumentParams, key: &str, field: &str) -> Option<Id> {
    let parsed = match map.get(key) {
        None | Some(Value::Null) => return None,
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<Id>().ok(),
        Some(_) => None,
    };
    if parsed.is_none() {
        errors.add(field, "must be an integer id");
    }
    parsed
}

fn flag(errors: &mut ValidationErrors, map: &DocumentParams, key: &str, field: &str) -> Option<bool> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            errors.add(field, "must be true or false");
            None
        }
    }
}

fn date(errors: &mut ValidationErrors, map: &DocumentParams, key: &'static str) -> Option<NaiveDate> {
    let raw = match map.get(key) {
        None | Some(Value::Null) => return None,
        Some(Value::String(s)) => s.as_str(),
        Some(_) => {
            errors.add(key, "must be a date in YYYY-MM-DD format");
            return None;
        }
    };
    match parse_optional_date(key, Some(raw)) {
        Ok(date) => date,
        Err(err) => {
            errors.add_core(err);
            None
        }
    }
}

/// An explicit `null` clears the column; otherwise `read` decides
fn clearable<T>(map: &DocumentParams, key: &str, read: impl FnOnce() -> Option<T>) -> Option<Option<T>> {
    match map.get(key) {
        Some(Value::Null) => Some(None),
        _ => read().map(Some),
    }
}

fn status(errors: &mut ValidationErrors, kind: DocumentKind, map: &DocumentParams) -> Option<&'static str> {
    let value = text(errors, map, "status", "status")?;
    match kind.parse_status(value.trim()) {
        Ok(status) => Some(status),
        Err(err) => {
            errors.add_core(err);
            None
        }
    }
}

fn require<T>(errors: &mut ValidationErrors, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() && !errors.has_error(field) {
        errors.add_required(field);
    }
    value
}

/// Read one line object. `prefix` namespaces error keys for nested lines.
fn read_line(
    errors: &mut ValidationErrors,
    kind: DocumentKind,
    map: &DocumentParams,
    prefix: &str,
    description_required: bool,
) -> Option<NewLineDto> {
    let field = |name: &str| format!("{prefix}{name}");
    let price_key = kind.price_column();

    let description = text(errors, map, "description", &field("description"));
    let description = if description_required {
        require(errors, &field("description"), description)?
    } else {
        description.unwrap_or_default()
    };
    let product_id = id(errors, map, "product_id", &field("product_id"));
    let quantity = number(errors, map, "quantity", &field("quantity")).unwrap_or(1.0);
    let unit_price = number(errors, map, price_key, &field(price_key)).unwrap_or(0.0);
    let milestone_flag = if kind.has_milestones() {
        flag(errors, map, "milestone_flag", &field("milestone_flag")).unwrap_or(false)
    } else {
        false
    };

    Some(NewLineDto {
        product_id,
        description,
        quantity,
        unit_price,
        milestone_flag,
    })
}

/// New document header plus optional nested `lines`
pub struct CreateDocumentContract {
    pub kind: DocumentKind,
}

impl Contract<DocumentParams> for CreateDocumentContract {
    type Output = CreateDocumentDto;

    fn validate(&self, input: DocumentParams) -> ValidationResult<CreateDocumentDto> {
        let kind = self.kind;
        let mut errors = ValidationErrors::new();

        let number = text(&mut errors, &input, kind.number_column(), kind.number_column());
        let number = require(&mut errors, kind.number_column(), number);
        let partner_id = id(&mut errors, &input, kind.partner_column(), kind.partner_column());
        let partner_id = require(&mut errors, kind.partner_column(), partner_id);
        let document_date = date(&mut errors, &input, kind.date_column());
        let document_date = require(&mut errors, kind.date_column(), document_date);
        let due_date = if kind.has_due_date() {
            date(&mut errors, &input, "due_date")
        } else {
            None
        };
        let project_id = id(&mut errors, &input, "project_id", "project_id");
        let status = status(&mut errors, kind, &input).unwrap_or(DEFAULT_STATUS);
        let currency = text(&mut errors, &input, "currency", "currency")
            .map(|c| c.trim().to_string())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let notes = text(&mut errors, &input, "notes", "notes");

        let mut lines = Vec::new();
        match input.get("lines") {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    let prefix = format!("lines[{index}].");
                    match item {
                        Value::Object(line) => {
                            if let Some(line) = read_line(&mut errors, kind, line, &prefix, false) {
                                lines.push(line);
                            }
                        }
                        _ => errors.add(format!("lines[{index}]"), "must be an object"),
                    }
                }
            }
            Some(_) => errors.add("lines", "must be a list of line objects"),
        }

        let dto = number
            .zip(partner_id)
            .zip(document_date)
            .map(|((number, partner_id), document_date)| CreateDocumentDto {
                number: number.trim().to_string(),
                partner_id,
                project_id,
                document_date,
                due_date,
                status: status.to_string(),
                currency,
                notes,
                lines,
            });
        finish(errors, dto)
    }
}

/// Header update: status, currency, notes and dates
pub struct UpdateDocumentContract {
    pub kind: DocumentKind,
}

impl Contract<DocumentParams> for UpdateDocumentContract {
    type Output = UpdateDocumentDto;

    fn validate(&self, input: DocumentParams) -> ValidationResult<UpdateDocumentDto> {
        let kind = self.kind;
        let mut errors = ValidationErrors::new();

        let status = status(&mut errors, kind, &input);
        let currency = text(&mut errors, &input, "currency", "currency").map(|c| c.trim().to_string());
        let notes = match input.get("notes") {
            Some(Value::String(s)) => Some(Some(s.clone()).filter(|s| !s.trim().is_empty())),
            Some(Value::Null) => Some(None),
            None => None,
            Some(_) => {
                errors.add("notes", "must be a string");
                None
            }
        };
        let document_date = date(&mut errors, &input, kind.date_column());
        let due_date = if kind.has_due_date() {
            clearable(&input, "due_date", || date(&mut errors, &input, "due_date"))
        } else {
            None
        };

        let dto = UpdateDocumentDto {
            status: status.map(str::to_string),
            currency,
            notes,
            document_date,
            due_date,
        };
        finish(errors, Some(dto))
    }
}

/// A single line added to an existing document; description is required
pub struct LineContract {
    pub kind: DocumentKind,
}

impl Contract<DocumentParams> for LineContract {
    type Output = NewLineDto;

    fn validate(&self, input: DocumentParams) -> ValidationResult<NewLineDto> {
        let mut errors = ValidationErrors::new();
        let line = read_line(&mut errors, self.kind, &input, "", true);
        finish(errors, line)
    }
}

/// Partial line update; the total is recomputed by the repository
pub struct UpdateLineContract {
    pub kind: DocumentKind,
}

impl Contract<DocumentParams> for UpdateLineContract {
    type Output = UpdateLineDto;

    fn validate(&self, input: DocumentParams) -> ValidationResult<UpdateLineDto> {
        let kind = self.kind;
        let price_key = kind.price_column();
        let mut errors = ValidationErrors::new();

        if matches!(input.get("description"), Some(Value::String(s)) if s.trim().is_empty()) {
            errors.add("description", "can't be blank");
        }
        let dto = UpdateLineDto {
            product_id: clearable(&input, "product_id", || {
                id(&mut errors, &input, "product_id", "product_id")
            }),
            description: text(&mut errors, &input, "description", "description"),
            quantity: number(&mut errors, &input, "quantity", "quantity"),
            unit_price: number(&mut errors, &input, price_key, price_key),
            milestone_flag: if kind.has_milestones() {
                flag(&mut errors, &input, "milestone_flag", "milestone_flag")
            } else {
                None
            },
        };
        finish(errors, Some(dto))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> DocumentParams {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn test_sales_order_with_lines() {
        let contract = CreateDocumentContract {
            kind: DocumentKind::SalesOrder,
        };
        let dto = contract
            .validate(params(json!({
                "so_number": "SO-1",
                "customer_id": 3,
                "order_date": "2024-03-01",
                "lines": [
                    {"description": "Design", "quantity": 3, "unit_price": 10, "milestone_flag": true},
                    {"unit_price": "2.5"}
                ]
            })))
            .unwrap();
        assert_eq!(dto.number, "SO-1");
        assert_eq!(dto.partner_id, 3);
        assert_eq!(dto.status, "draft");
        assert_eq!(dto.currency, "USD");
        assert_eq!(dto.due_date, None);
        assert_eq!(dto.lines.len(), 2);
        assert_eq!(dto.lines[0].quantity, 3.0);
        assert!(dto.lines[0].milestone_flag);
        assert_eq!(dto.lines[1].quantity, 1.0);
        assert_eq!(dto.lines[1].unit_price, 2.5);
        assert_eq!(dto.lines[1].description, "");
    }

    #[test]
    fn test_required_keys_follow_kind() {
        let contract = CreateDocumentContract {
            kind: DocumentKind::VendorBill,
        };
        let errors = contract.validate(params(json!({"notes": "x"}))).unwrap_err();
        assert_eq!(
            errors.missing_fields(),
            vec!["bill_date", "bill_number", "vendor_id"]
        );
    }

    #[test]
    fn test_invoice_due_date_and_status() {
        let contract = CreateDocumentContract {
            kind: DocumentKind::CustomerInvoice,
        };
        let dto = contract
            .validate(params(json!({
                "invoice_number": "INV-9",
                "customer_id": "4",
                "invoice_date": "2024-03-01",
                "due_date": "2024-03-31",
                "status": "posted",
                "currency": "EUR"
            })))
            .unwrap();
        assert_eq!(dto.partner_id, 4);
        assert_eq!(dto.due_date, NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(dto.status, "posted");
        assert_eq!(dto.currency, "EUR");

        let errors = contract
            .validate(params(json!({
                "invoice_number": "INV-9",
                "customer_id": 4,
                "invoice_date": "2024-03-01",
                "status": "confirmed"
            })))
            .unwrap_err();
        assert!(errors.has_error("status"));
    }

    #[test]
    fn test_line_errors_are_positional() {
        let contract = CreateDocumentContract {
            kind: DocumentKind::PurchaseOrder,
        };
        let errors = contract
            .validate(params(json!({
                "po_number": "PO-1",
                "vendor_id": 2,
                "order_date": "2024-03-01",
                "lines": [{"unit_cost": 5}, {"quantity": -1, "unit_cost": "abc"}, 7]
            })))
            .unwrap_err();
        assert!(errors.has_error("lines[1].quantity"));
        assert!(errors.has_error("lines[1].unit_cost"));
        assert!(errors.has_error("lines[2]"));
        assert!(!errors.has_error("lines[0].unit_cost"));
    }

    #[test]
    fn test_purchase_lines_ignore_milestones() {
        let contract = LineContract {
            kind: DocumentKind::PurchaseOrder,
        };
        let line = contract
            .validate(params(json!({
                "description": "Licences",
                "unit_cost": 40,
                "unit_price": 99,
                "milestone_flag": true
            })))
            .unwrap();
        assert_eq!(line.unit_price, 40.0);
        assert!(!line.milestone_flag);
    }

    #[test]
    fn test_added_line_requires_description() {
        let contract = LineContract {
            kind: DocumentKind::SalesOrder,
        };
        let errors = contract
            .validate(params(json!({"quantity": 2})))
            .unwrap_err();
        assert_eq!(errors.missing_fields(), vec!["description"]);
    }

    #[test]
    fn test_update_document_and_line() {
        let dto = UpdateDocumentContract {
            kind: DocumentKind::SalesOrder,
        }
        .validate(params(json!({"status": "confirmed", "due_date": "2024-01-01"})))
        .unwrap();
        assert_eq!(dto.status.as_deref(), Some("confirmed"));
        assert_eq!(dto.due_date, None);

        let line = UpdateLineContract {
            kind: DocumentKind::VendorBill,
        }
        .validate(params(json!({"quantity": 4, "unit_cost": 12.5})))
        .unwrap();
        assert_eq!(line.quantity, Some(4.0));
        assert_eq!(line.unit_price, Some(12.5));
        assert_eq!(line.description, None);
        assert_eq!(line.product_id, None);
    }

    #[test]
    fn test_update_null_clears_optional_fields() {
        let dto = UpdateDocumentContract {
            kind: DocumentKind::CustomerInvoice,
        }
        .validate(params(json!({"due_date": null, "notes": null})))
        .unwrap();
        assert_eq!(dto.due_date, Some(None));
        assert_eq!(dto.notes, Some(None));
        assert_eq!(dto.status, None);

        let dto = UpdateDocumentContract {
            kind: DocumentKind::CustomerInvoice,
        }
        .validate(params(json!({"due_date": "2024-04-30", "notes": "  "})))
        .unwrap();
        assert_eq!(dto.due_date, Some(NaiveDate::from_ymd_opt(2024, 4, 30)));
        assert_eq!(dto.notes, Some(None));

        let line = UpdateLineContract {
            kind: DocumentKind::SalesOrder,
        }
        .validate(params(json!({"product_id": null})))
        .unwrap();
        assert_eq!(line.product_id, Some(None));
    }
}
