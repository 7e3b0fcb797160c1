//! Common types used throughout ProjectLedger
//!
//! Enumerations are stored as lowercase text columns; request input is
//! parsed through [`TextEnum::parse_field`] so an unknown value is reported
//! against the field it came from.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Primary key type
pub type Id = i64;

/// Enumerations persisted as text
pub trait TextEnum: Sized + Copy + 'static {
    /// Every accepted value, in declaration order
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == value)
    }

    /// Parse a value submitted for `field`
    fn parse_field(field: &'static str, value: &str) -> Result<Self, CoreError> {
        Self::parse(value).ok_or_else(|| CoreError::InvalidEnum {
            field,
            value: value.to_string(),
            allowed: Self::ALL
                .iter()
                .map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl TextEnum for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum! {
    /// Project lifecycle status
    pub enum ProjectStatus {
        Planning => "planning",
        Active => "active",
        OnHold => "on_hold",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

text_enum! {
    pub enum TaskPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

text_enum! {
    /// Task workflow state
    pub enum TaskState {
        Todo => "todo",
        InProgress => "in_progress",
        Review => "review",
        Blocked => "blocked",
        Done => "done",
        Completed => "completed",
        Closed => "closed",
    }
}

impl TaskState {
    /// States that end a task's lifecycle; never overdue or due soon
    pub const TERMINAL: [TaskState; 3] = [TaskState::Done, TaskState::Completed, TaskState::Closed];

    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }

    /// Terminal check on a stored state string
    pub fn is_terminal_str(state: &str) -> bool {
        Self::parse(state).is_some_and(|s| s.is_terminal())
    }
}

text_enum! {
    pub enum TimesheetStatus {
        Draft => "draft",
        Submitted => "submitted",
        Approved => "approved",
        Rejected => "rejected",
    }
}

text_enum! {
    /// Expense approval status
    pub enum ExpenseStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Reimbursed => "reimbursed",
    }
}

text_enum! {
    pub enum PartnerType {
        Customer => "customer",
        Vendor => "vendor",
        Both => "both",
    }
}

impl PartnerType {
    /// Whether a partner of this type may act in `role`
    pub fn accepts(&self, role: PartnerRole) -> bool {
        matches!(
            (self, role),
            (PartnerType::Both, _)
                | (PartnerType::Customer, PartnerRole::Customer)
                | (PartnerType::Vendor, PartnerRole::Vendor)
        )
    }
}

/// The side a partner plays on a commercial document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartnerRole {
    Customer,
    Vendor,
}

impl PartnerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartnerRole::Customer => "customer",
            PartnerRole::Vendor => "vendor",
        }
    }
}

text_enum! {
    pub enum ProductType {
        Service => "service",
        Product => "product",
        Consumable => "consumable",
    }
}

text_enum! {
    /// Status of sales and purchase orders
    pub enum OrderStatus {
        Draft => "draft",
        Confirmed => "confirmed",
        Done => "done",
        Cancelled => "cancelled",
    }
}

text_enum! {
    /// Status of customer invoices and vendor bills
    pub enum BillingStatus {
        Draft => "draft",
        Posted => "posted",
        Paid => "paid",
        Cancelled => "cancelled",
    }
}
