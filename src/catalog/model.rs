//! Wire types for the catalog `items_batch` endpoint.
//!
//! Optional fields are skipped when absent or empty so the encoded body only
//! carries what the caller set. The remote service owns field validation.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Item type discriminator sent with every batch.
pub const PRODUCT_ITEM: &str = "PRODUCT_ITEM";

/// Verb applied to a single item in a batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Create,
    Update,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Create => "CREATE",
            Method::Update => "UPDATE",
            Method::Delete => "DELETE",
        }
    }
}

/// One entry of the `requests` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Operation {
    pub method: Method,
    pub data: Product,
}

impl Operation {
    pub fn create(data: Product) -> Self {
        Self {
            method: Method::Create,
            data,
        }
    }

    pub fn update(data: Product) -> Self {
        Self {
            method: Method::Update,
            data,
        }
    }

    /// Delete only needs the retailer id; every other field stays empty.
    pub fn delete(id: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            data: Product {
                id: id.into(),
                ..Default::default()
            },
        }
    }
}

/// Outbound envelope. Built once per call and consumed by one exchange.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BatchRequest<'a> {
    pub access_token: &'a str,
    pub item_type: &'static str,
    pub requests: &'a [Operation],
    pub allow_upsert: bool,
}

impl<'a> BatchRequest<'a> {
    pub fn new(requests: &'a [Operation], access_token: &'a str, allow_upsert: bool) -> Self {
        Self {
            access_token,
            item_type: PRODUCT_ITEM,
            requests,
            allow_upsert,
        }
    }
}

/// Per-platform deep links.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Applink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios_app_store_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios_app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iphone_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iphone_app_store_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iphone_app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipad_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipad_app_store_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipad_app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android_package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android_app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows_phone_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows_phone_app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows_phone_app_name: Option<String>,
}

/// Image or video entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Media {
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<String>,
}

impl Media {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tag: Vec::new(),
        }
    }
}

/// A catalog product item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_image_link: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_variant_attribute: Vec<BTreeMap<String, String>>,
    /// newborn, infant, toddler, kids or adult.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applink: Option<Applink>,
    /// in stock, out of stock, available for order or discontinued.
    #[serde(default)]
    pub availability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// new, refurbished or used.
    #[serde(default)]
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_label_0: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_label_1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_label_2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_label_3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_label_4: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_product_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gtin: Option<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image: Vec<Media>,
    /// Not required when `image` is provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_link: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub video: Vec<Media>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_group_id: Option<String>,
    #[serde(default)]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer_part_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default)]
    pub price: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub product_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price_effective_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default)]
    pub title: String,
}

impl Product {
    /// Item with the always-required fields set.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        availability: impl Into<String>,
        condition: impl Into<String>,
        price: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            availability: availability.into(),
            condition: condition.into(),
            price: price.into(),
            link: link.into(),
            ..Default::default()
        }
    }

    /// Set `sale_price_effective_date` to `start/end` in ISO-8601 with offset,
    /// e.g. `2024-03-01T00:00+01:00/2024-03-31T23:59+01:00`.
    pub fn set_sale_window<Tz>(&mut self, start: DateTime<Tz>, end: DateTime<Tz>)
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        const FMT: &str = "%Y-%m-%dT%H:%M%:z";
        self.sale_price_effective_date =
            Some(format!("{}/{}", start.format(FMT), end.format(FMT)));
    }
}

/// Error record used both for top-level failures and per-item validation.
///
/// Every field is optional on the wire; nested records are accepted however
/// sparse they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fbtrace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_subcode: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_user_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_user_msg: Option<String>,
}

/// `<type> <code> <message>`, leaving out an empty type, a zero code and an
/// empty message.
impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = (self.code != 0).then(|| self.code.to_string());
        let parts = [
            Some(self.kind.as_str()),
            code.as_deref(),
            Some(self.message.as_str()),
        ];
        let mut first = true;
        for part in parts.into_iter().flatten().filter(|p| !p.is_empty()) {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(part)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Validation block for one submitted item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub retailer_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<ApiError>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub warnings: Vec<ApiError>,
}

/// Success-shaped response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub handles: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub validation_status: Vec<ValidationStatus>,
}

impl BatchResponse {
    /// Every warning paired with the retailer id it was reported for.
    pub fn warnings(&self) -> impl Iterator<Item = (&str, &ApiError)> {
        self.validation_status.iter().flat_map(|status| {
            status
                .warnings
                .iter()
                .map(move |w| (status.retailer_id.as_str(), w))
        })
    }
}

/// Explicit `null` reads as the empty value, same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Top-level error record. Unlike nested records it must carry `message`;
/// that is what tells the error shape apart from an unrecognised body.
#[derive(Deserialize)]
pub(crate) struct TopLevelError {
    message: String,
    #[serde(flatten)]
    details: ApiError,
}

impl From<TopLevelError> for ApiError {
    fn from(err: TopLevelError) -> Self {
        ApiError {
            message: err.message,
            ..err.details
        }
    }
}

/// Error-shaped response, bare or wrapped in Graph's `error` object.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorResponse {
    Wrapped { error: TopLevelError },
    Bare(TopLevelError),
}

impl ErrorResponse {
    pub(crate) fn into_inner(self) -> ApiError {
        match self {
            ErrorResponse::Wrapped { error } => error.into(),
            ErrorResponse::Bare(error) => error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Utc};
    use serde_json::json;

    fn shirt() -> Product {
        Product::new(
            "sku-1",
            "Shirt",
            "Cotton shirt",
            "in stock",
            "new",
            "10.00 USD",
            "https://shop/sku-1",
        )
    }

    #[test]
    fn product_omits_unset_optional_fields() {
        let body = serde_json::to_value(shirt()).unwrap();
        assert_eq!(
            body,
            json!({
                "availability": "in stock",
                "condition": "new",
                "description": "Cotton shirt",
                "id": "sku-1",
                "link": "https://shop/sku-1",
                "price": "10.00 USD",
                "title": "Shirt",
            })
        );
    }

    #[test]
    fn product_includes_set_optional_fields() {
        let mut item = shirt();
        item.inventory = Some(0);
        item.custom_label_3 = Some("summer".into());
        item.image = vec![Media {
            url: "https://cdn/a.jpg".into(),
            tag: vec!["front".into()],
        }];
        item.video = vec![Media::new("https://cdn/a.mp4")];
        item.applink = Some(Applink {
            android_package: Some("com.shop".into()),
            ..Default::default()
        });
        item.additional_variant_attribute =
            vec![BTreeMap::from([("fit".to_string(), "slim".to_string())])];

        let body = serde_json::to_value(item).unwrap();
        assert_eq!(body["inventory"], 0);
        assert_eq!(body["custom_label_3"], "summer");
        assert_eq!(body["image"][0]["tag"][0], "front");
        assert!(body["video"][0].get("tag").is_none());
        assert_eq!(body["applink"], json!({ "android_package": "com.shop" }));
        assert_eq!(body["additional_variant_attribute"][0]["fit"], "slim");
        assert!(body.get("brand").is_none());
    }

    #[test]
    fn delete_operation_only_carries_id() {
        let body = serde_json::to_value(Operation::delete("sku-9")).unwrap();
        assert_eq!(body["method"], "DELETE");
        assert_eq!(body["data"]["id"], "sku-9");
        assert!(body["data"].get("sale_price").is_none());
    }

    #[test]
    fn method_serializes_upper_case() {
        for method in [Method::Create, Method::Update, Method::Delete] {
            assert_eq!(serde_json::to_value(method).unwrap(), method.as_str());
        }
    }

    #[test]
    fn sale_window_uses_offset_timestamps() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        let mut item = shirt();
        item.set_sale_window(
            tz.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            tz.with_ymd_and_hms(2024, 3, 31, 23, 59, 0).unwrap(),
        );
        assert_eq!(
            item.sale_price_effective_date.as_deref(),
            Some("2024-03-01T00:00+01:00/2024-03-31T23:59+01:00")
        );

        item.set_sale_window(
            Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 8, 30, 0).unwrap(),
        );
        assert_eq!(
            item.sale_price_effective_date.as_deref(),
            Some("2024-01-01T08:30+00:00/2024-01-02T08:30+00:00")
        );
    }

    #[test]
    fn api_error_display_matches_type_code_message() {
        let err: ApiError = serde_json::from_value(json!({
            "message": "Invalid token",
            "type": "OAuthException",
            "code": 190,
            "fbtrace_id": "t2"
        }))
        .unwrap();
        assert_eq!(err.to_string(), "OAuthException 190 Invalid token");
        assert_eq!(err.fbtrace_id, "t2");
    }

    #[test]
    fn warnings_are_paired_with_retailer_id() {
        let resp: BatchResponse = serde_json::from_value(json!({
            "handles": ["h1"],
            "validation_status": [
                { "retailer_id": "r1", "errors": [], "warnings": [{ "message": "w1" }] },
                { "retailer_id": "r2", "warnings": [{ "message": "w2" }] }
            ]
        }))
        .unwrap();
        let warnings: Vec<_> = resp
            .warnings()
            .map(|(id, w)| (id, w.message.as_str()))
            .collect();
        assert_eq!(warnings, vec![("r1", "w1"), ("r2", "w2")]);
    }

    #[test]
    fn error_response_accepts_bare_and_wrapped() {
        let bare: ErrorResponse =
            serde_json::from_value(json!({ "message": "m", "code": 1 })).unwrap();
        assert_eq!(bare.into_inner().code, 1);

        let wrapped: ErrorResponse =
            serde_json::from_value(json!({ "error": { "message": "m", "code": 2 } })).unwrap();
        assert_eq!(wrapped.into_inner().code, 2);

        assert!(serde_json::from_value::<ErrorResponse>(json!({ "handles": [] })).is_err());
    }

    #[test]
    fn top_level_error_keeps_message_and_details() {
        let err = serde_json::from_value::<ErrorResponse>(json!({
            "message": "Invalid token",
            "type": "OAuthException",
            "code": 190,
            "fbtrace_id": "t2",
            "error_user_msg": "log in again"
        }))
        .unwrap()
        .into_inner();
        assert_eq!(err.message, "Invalid token");
        assert_eq!(err.kind, "OAuthException");
        assert_eq!(err.fbtrace_id, "t2");
        assert_eq!(err.error_user_msg.as_deref(), Some("log in again"));

        let wrapped = json!({ "error": { "type": "OAuthException", "code": 190 } });
        assert!(serde_json::from_value::<ErrorResponse>(wrapped).is_err());
    }

    #[test]
    fn nested_records_need_no_fields() {
        let err: ApiError = serde_json::from_value(json!({ "type": "w", "code": 1 })).unwrap();
        assert_eq!(err.message, "");
        let err: ApiError = serde_json::from_value(json!({})).unwrap();
        assert_eq!(err, ApiError::default());
    }

    #[test]
    fn null_fields_read_as_empty() {
        let resp: BatchResponse = serde_json::from_value(json!({
            "handles": ["h1"],
            "validation_status": [{
                "retailer_id": null,
                "errors": null,
                "warnings": [{ "message": null, "type": null, "code": null, "fbtrace_id": null }]
            }]
        }))
        .unwrap();
        assert_eq!(resp.validation_status[0].retailer_id, "");
        assert!(resp.validation_status[0].errors.is_empty());
        assert_eq!(resp.validation_status[0].warnings[0], ApiError::default());

        let resp: BatchResponse =
            serde_json::from_value(json!({ "handles": null, "validation_status": null })).unwrap();
        assert_eq!(resp, BatchResponse::default());
    }

    #[test]
    fn api_error_display_skips_empty_parts() {
        let only_message = ApiError {
            message: "bad price".into(),
            ..Default::default()
        };
        assert_eq!(only_message.to_string(), "bad price");

        let no_message = ApiError {
            kind: "param".into(),
            code: 100,
            ..Default::default()
        };
        assert_eq!(no_message.to_string(), "param 100");

        let no_kind = ApiError {
            code: 7,
            message: "x".into(),
            ..Default::default()
        };
        assert_eq!(no_kind.to_string(), "7 x");
        assert_eq!(ApiError::default().to_string(), "");
    }
}
