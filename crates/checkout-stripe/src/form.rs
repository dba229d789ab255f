//! # Stripe Form Encoding
//!
//! Stripe takes `application/x-www-form-urlencoded` bodies with bracketed
//! keys (`line_items[0][price_data][currency]`). These functions flatten a
//! [`CardCheckoutRequest`] into ordered key/value pairs.

use checkout_core::{CardCheckoutRequest, CardFlow, CheckoutError, CheckoutResult};

/// Countries the hosted page collects shipping addresses for
pub const SHIPPING_COUNTRIES: [&str; 2] = ["US", "CA"];

pub type FormParams = Vec<(String, String)>;

/// Form body for `POST /v1/checkout/sessions`
pub fn session_form_params(request: &CardCheckoutRequest) -> CheckoutResult<FormParams> {
    let (success_url, cancel_url) = match &request.flow {
        CardFlow::HostedSession {
            success_url,
            cancel_url,
        } => (success_url, cancel_url),
        CardFlow::Embedded => {
            return Err(CheckoutError::Precondition(
                "hosted session requested for an embedded card flow".to_string(),
            ))
        }
    };

    let currency = request.currency.as_str();

    let mut form_params: FormParams = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), success_url.clone()),
        ("cancel_url".to_string(), cancel_url.clone()),
        (
            "billing_address_collection".to_string(),
            "required".to_string(),
        ),
    ];

    for (i, country) in SHIPPING_COUNTRIES.iter().enumerate() {
        form_params.push((
            format!("shipping_address_collection[allowed_countries][{}]", i),
            country.to_string(),
        ));
    }

    for (i, item) in request.line_items.iter().enumerate() {
        form_params.push((
            format!("line_items[{}][price_data][currency]", i),
            currency.to_string(),
        ));
        form_params.push((
            format!("line_items[{}][price_data][unit_amount]", i),
            item.unit_amount.to_string(),
        ));
        form_params.push((
            format!("line_items[{}][price_data][product_data][name]", i),
            item.name.clone(),
        ));
        if let Some(ref desc) = item.description {
            form_params.push((
                format!("line_items[{}][price_data][product_data][description]", i),
                desc.clone(),
            ));
        }
        if let Some(ref image) = item.image_url {
            form_params.push((
                format!("line_items[{}][price_data][product_data][images][0]", i),
                image.clone(),
            ));
        }
        for (key, value) in &item.metadata {
            form_params.push((
                format!("line_items[{}][price_data][product_data][metadata][{}]", i, key),
                value.clone(),
            ));
        }
        form_params.push((
            format!("line_items[{}][quantity]", i),
            item.quantity.to_string(),
        ));
    }

    if let Some(ref email) = request.customer_email {
        form_params.push(("customer_email".to_string(), email.clone()));
    }

    push_metadata(&mut form_params, request);
    Ok(form_params)
}

/// Form body for `POST /v1/payment_intents`. The amount is the sum of the
/// request's line items, shipping and tax included.
pub fn payment_intent_form_params(request: &CardCheckoutRequest) -> FormParams {
    let mut form_params: FormParams = vec![
        ("amount".to_string(), request.charged_total().to_string()),
        ("currency".to_string(), request.currency.as_str().to_string()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
    ];

    if let Some(ref email) = request.customer_email {
        form_params.push(("receipt_email".to_string(), email.clone()));
    }

    push_metadata(&mut form_params, request);
    form_params
}

fn push_metadata(form_params: &mut FormParams, request: &CardCheckoutRequest) {
    for (key, value) in &request.metadata {
        form_params.push((format!("metadata[{}]", key), value.clone()));
    }
}
