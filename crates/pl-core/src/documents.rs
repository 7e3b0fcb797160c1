//! Commercial document kinds
//!
//! Sales orders, purchase orders, customer invoices and vendor bills share
//! one shape: a numbered header issued to a partner, an optional project
//! link, and an owned list of priced lines. [`DocumentKind`] names the parts
//! that differ. The column names double as JSON field names.

use crate::error::CoreError;
use crate::types::{BillingStatus, OrderStatus, PartnerRole, TextEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    SalesOrder,
    PurchaseOrder,
    CustomerInvoice,
    VendorBill,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::SalesOrder,
        DocumentKind::PurchaseOrder,
        DocumentKind::CustomerInvoice,
        DocumentKind::VendorBill,
    ];

    /// Human-readable name, used in messages
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::SalesOrder => "Sales order",
            DocumentKind::PurchaseOrder => "Purchase order",
            DocumentKind::CustomerInvoice => "Customer invoice",
            DocumentKind::VendorBill => "Vendor bill",
        }
    }

    /// Singular JSON key wrapping one document
    pub fn singular_key(&self) -> &'static str {
        match self {
            DocumentKind::SalesOrder => "sales_order",
            DocumentKind::PurchaseOrder => "purchase_order",
            DocumentKind::CustomerInvoice => "customer_invoice",
            DocumentKind::VendorBill => "vendor_bill",
        }
    }

    /// Header table; also the JSON key wrapping a list
    pub fn table(&self) -> &'static str {
        match self {
            DocumentKind::SalesOrder => "sales_orders",
            DocumentKind::PurchaseOrder => "purchase_orders",
            DocumentKind::CustomerInvoice => "customer_invoices",
            DocumentKind::VendorBill => "vendor_bills",
        }
    }

    pub fn lines_table(&self) -> &'static str {
        match self {
            DocumentKind::SalesOrder => "sales_order_lines",
            DocumentKind::PurchaseOrder => "purchase_order_lines",
            DocumentKind::CustomerInvoice => "customer_invoice_lines",
            DocumentKind::VendorBill => "vendor_bill_lines",
        }
    }

    /// Foreign key column on the lines table
    pub fn parent_column(&self) -> &'static str {
        match self {
            DocumentKind::SalesOrder => "sales_order_id",
            DocumentKind::PurchaseOrder => "purchase_order_id",
            DocumentKind::CustomerInvoice => "customer_invoice_id",
            DocumentKind::VendorBill => "vendor_bill_id",
        }
    }

    pub fn number_column(&self) -> &'static str {
        match self {
            DocumentKind::SalesOrder => "so_number",
            DocumentKind::PurchaseOrder => "po_number",
            DocumentKind::CustomerInvoice => "invoice_number",
            DocumentKind::VendorBill => "bill_number",
        }
    }

    pub fn partner_role(&self) -> PartnerRole {
        match self {
            DocumentKind::SalesOrder | DocumentKind::CustomerInvoice => PartnerRole::Customer,
            DocumentKind::PurchaseOrder | DocumentKind::VendorBill => PartnerRole::Vendor,
        }
    }

    /// `customer_id` or `vendor_id`
    pub fn partner_column(&self) -> &'static str {
        match self.partner_role() {
            PartnerRole::Customer => "customer_id",
            PartnerRole::Vendor => "vendor_id",
        }
    }

    /// `customer_name` or `vendor_name`
    pub fn partner_name_field(&self) -> &'static str {
        match self.partner_role() {
            PartnerRole::Customer => "customer_name",
            PartnerRole::Vendor => "vendor_name",
        }
    }

    pub fn date_column(&self) -> &'static str {
        match self {
            DocumentKind::SalesOrder | DocumentKind::PurchaseOrder => "order_date",
            DocumentKind::CustomerInvoice => "invoice_date",
            DocumentKind::VendorBill => "bill_date",
        }
    }

    /// Invoices and bills carry a payment due date
    pub fn has_due_date(&self) -> bool {
        matches!(self, DocumentKind::CustomerInvoice | DocumentKind::VendorBill)
    }

    /// Sales order lines can be flagged as billing milestones
    pub fn has_milestones(&self) -> bool {
        matches!(self, DocumentKind::SalesOrder)
    }

    /// `unit_price` on the selling side, `unit_cost` on the buying side
    pub fn price_column(&self) -> &'static str {
        match self.partner_role() {
            PartnerRole::Customer => "unit_price",
            PartnerRole::Vendor => "unit_cost",
        }
    }

    /// Validate a submitted status against this kind's enumeration
    pub fn parse_status(&self, value: &str) -> Result<&'static str, CoreError> {
        match self {
            DocumentKind::SalesOrder | DocumentKind::PurchaseOrder => {
                OrderStatus::parse_field("status", value).map(|s| s.as_str())
            }
            DocumentKind::CustomerInvoice | DocumentKind::VendorBill => {
                BillingStatus::parse_field("status", value).map(|s| s.as_str())
            }
        }
    }

    /// Message used when the referenced partner is missing or of the wrong type
    pub fn partner_not_found_message(&self) -> String {
        format!("Valid {} not found", self.partner_role().as_str())
    }
}

/// Derived line total
pub fn line_total(quantity: f64, unit_price: f64) -> f64 {
    quantity * unit_price
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selling_side_uses_customer_and_unit_price() {
        for kind in [DocumentKind::SalesOrder, DocumentKind::CustomerInvoice] {
            assert_eq!(kind.partner_column(), "customer_id");
            assert_eq!(kind.price_column(), "unit_price");
        }
        for kind in [DocumentKind::PurchaseOrder, DocumentKind::VendorBill] {
            assert_eq!(kind.partner_column(), "vendor_id");
            assert_eq!(kind.price_column(), "unit_cost");
        }
    }

    #[test]
    fn test_status_enumeration_per_kind() {
        assert_eq!(DocumentKind::SalesOrder.parse_status("confirmed"), Ok("confirmed"));
        assert!(DocumentKind::SalesOrder.parse_status("posted").is_err());
        assert_eq!(DocumentKind::VendorBill.parse_status("paid"), Ok("paid"));
        assert!(DocumentKind::CustomerInvoice.parse_status("done").is_err());
    }

    #[test]
    fn test_only_billing_documents_have_due_dates() {
        let with_due: Vec<_> = DocumentKind::ALL
            .iter()
            .filter(|k| k.has_due_date())
            .collect();
        assert_eq!(with_due, vec![&DocumentKind::CustomerInvoice, &DocumentKind::VendorBill]);
        assert!(DocumentKind::SalesOrder.has_milestones());
        assert!(!DocumentKind::PurchaseOrder.has_milestones());
    }

    #[test]
    fn test_partner_not_found_message() {
        assert_eq!(
            DocumentKind::SalesOrder.partner_not_found_message(),
            "Valid customer not found"
        );
        assert_eq!(
            DocumentKind::VendorBill.partner_not_found_message(),
            "Valid vendor not found"
        );
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(3.0, 10.0), 30.0);
        assert_eq!(line_total(0.0, 99.0), 0.0);
    }
}
