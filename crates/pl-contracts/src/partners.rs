//! Partner contracts

use pl_core::{PartnerType, TextEnum, ValidationErrors};
use pl_db::{CreatePartnerDto, UpdatePartnerDto};
use serde::Deserialize;

use crate::base::{
    clearable_text, finish, nullable, optional_enum, optional_text, required_text, Contract,
    ValidationResult,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePartnerParams {
    pub name: Option<String>,
    pub partner_type: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
}

pub struct CreatePartnerContract;

impl Contract<CreatePartnerParams> for CreatePartnerContract {
    type Output = CreatePartnerDto;

    fn validate(&self, input: CreatePartnerParams) -> ValidationResult<CreatePartnerDto> {
        let mut errors = ValidationErrors::new();

        let name = required_text(&mut errors, "name", input.name);
        let partner_type = match input.partner_type.as_deref().map(str::trim) {
            None | Some("") => {
                errors.add_required("partner_type");
                None
            }
            Some(value) => optional_enum::<PartnerType>(&mut errors, "partner_type", Some(value)),
        };

        let dto = name.zip(partner_type).map(|(name, partner_type)| CreatePartnerDto {
            name,
            partner_type: partner_type.as_str().to_string(),
            email: optional_text(input.email),
            phone: optional_text(input.phone),
            address: optional_text(input.address),
            tax_id: optional_text(input.tax_id),
        });
        finish(errors, dto)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePartnerParams {
    pub name: Option<String>,
    pub partner_type: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub tax_id: Option<Option<String>>,
    pub is_active: Option<bool>,
}

pub struct UpdatePartnerContract;

impl Contract<UpdatePartnerParams> for UpdatePartnerContract {
    type Output = UpdatePartnerDto;

    fn validate(&self, input: UpdatePartnerParams) -> ValidationResult<UpdatePartnerDto> {
        let mut errors = ValidationErrors::new();

        if matches!(&input.name, Some(n) if n.trim().is_empty()) {
            errors.add("name", "can't be blank");
        }
        let partner_type =
            optional_enum::<PartnerType>(&mut errors, "partner_type", input.partner_type.as_deref());

        let dto = UpdatePartnerDto {
            name: optional_text(input.name),
            partner_type: partner_type.map(|t| t.as_str().to_string()),
            email: clearable_text(input.email),
            phone: clearable_text(input.phone),
            address: clearable_text(input.address),
            tax_id: clearable_text(input.tax_id),
            is_active: input.is_active,
        };
        finish(errors, Some(dto))
    }
}

/// Query string of `GET /partners`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPartnersParams {
    pub partner_type: Option<String>,
}

pub struct ListPartnersContract;

impl Contract<ListPartnersParams> for ListPartnersContract {
    type Output = Option<PartnerType>;

    fn validate(&self, input: ListPartnersParams) -> ValidationResult<Option<PartnerType>> {
        let mut errors = ValidationErrors::new();
        let partner_type =
            optional_enum::<PartnerType>(&mut errors, "partner_type", input.partner_type.as_deref());
        finish(errors, Some(partner_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partner_requires_name_and_type() {
        let errors = CreatePartnerContract
            .validate(CreatePartnerParams::default())
            .unwrap_err();
        assert_eq!(errors.missing_fields(), vec!["name", "partner_type"]);

        let errors = CreatePartnerContract
            .validate(CreatePartnerParams {
                name: Some("Acme".into()),
                partner_type: Some("supplier".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(errors.has_error("partner_type"));
        assert!(errors.missing_fields().is_empty());
    }

    #[test]
    fn test_create_partner() {
        let dto = CreatePartnerContract
            .validate(CreatePartnerParams {
                name: Some("Acme".into()),
                partner_type: Some("both".into()),
                email: Some("".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(dto.partner_type, "both");
        assert_eq!(dto.email, None);
    }

    #[test]
    fn test_list_partners_filter() {
        assert_eq!(
            ListPartnersContract.validate(ListPartnersParams::default()),
            Ok(None)
        );
        assert_eq!(
            ListPartnersContract.validate(ListPartnersParams {
                partner_type: Some("vendor".into())
            }),
            Ok(Some(PartnerType::Vendor))
        );
        assert!(ListPartnersContract
            .validate(ListPartnersParams {
                partner_type: Some("nobody".into())
            })
            .is_err());
    }
}
