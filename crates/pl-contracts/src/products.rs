//! Product catalog contracts

use pl_core::{ProductType, TextEnum, ValidationErrors};
use pl_db::{CreateProductDto, UpdateProductDto};
use serde::Deserialize;

use crate::base::{
    clearable_text, enum_or, finish, non_negative, nullable, optional_enum, optional_text,
    required_text, Contract, ValidationResult,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProductParams {
    pub name: Option<String>,
    pub product_code: Option<String>,
    pub description: Option<String>,
    pub product_type: Option<String>,
    pub sale_price: Option<f64>,
    pub cost_price: Option<f64>,
}

pub struct CreateProductContract;

impl Contract<CreateProductParams> for CreateProductContract {
    type Output = CreateProductDto;

    fn validate(&self, input: CreateProductParams) -> ValidationResult<CreateProductDto> {
        let mut errors = ValidationErrors::new();

        let name = required_text(&mut errors, "name", input.name);
        let product_type = enum_or(
            &mut errors,
            "product_type",
            input.product_type.as_deref(),
            ProductType::Service,
        );
        let sale_price = non_negative(&mut errors, "sale_price", input.sale_price);
        let cost_price = non_negative(&mut errors, "cost_price", input.cost_price);

        let dto = name.map(|name| CreateProductDto {
            name,
            product_code: optional_text(input.product_code).map(|c| c.trim().to_string()),
            description: optional_text(input.description),
            product_type: product_type.as_str().to_string(),
            sale_price: sale_price.unwrap_or(0.0),
            cost_price: cost_price.unwrap_or(0.0),
        });
        finish(errors, dto)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductParams {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub product_code: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub product_type: Option<String>,
    pub sale_price: Option<f64>,
    pub cost_price: Option<f64>,
    pub is_active: Option<bool>,
}

pub struct UpdateProductContract;

impl Contract<UpdateProductParams> for UpdateProductContract {
    type Output = UpdateProductDto;

    fn validate(&self, input: UpdateProductParams) -> ValidationResult<UpdateProductDto> {
        let mut errors = ValidationErrors::new();

        if matches!(&input.name, Some(n) if n.trim().is_empty()) {
            errors.add("name", "can't be blank");
        }
        let product_type =
            optional_enum::<ProductType>(&mut errors, "product_type", input.product_type.as_deref());
        let sale_price = non_negative(&mut errors, "sale_price", input.sale_price);
        let cost_price = non_negative(&mut errors, "cost_price", input.cost_price);

        let dto = UpdateProductDto {
            name: optional_text(input.name),
            product_code: clearable_text(input.product_code)
                .map(|code| code.map(|c| c.trim().to_string())),
            description: clearable_text(input.description),
            product_type: product_type.map(|t| t.as_str().to_string()),
            sale_price,
            cost_price,
            is_active: input.is_active,
        };
        finish(errors, Some(dto))
    }
}
