//! Built-in teda verification cases

use super::{Action, Case, ProbeCase, Suite, SuiteError, Tag};
use crate::config::EndpointsConfig;
use crate::probe::mock::{MockResponse, MockSetup};
use crate::probe::{Endpoint, ExpectedResponse, FailureKind, FailureMode};
use serde_json::{json, Value};

/// Catalog export uploaded by the uploader cases
pub const CATALOG_FILE: &str = "catalog_data.csv";

/// Product sales export uploaded by the uploader cases
pub const PRODUCT_FILE: &str = "products_sales.csv";

/// Body of a finished ingestion
pub fn complete_json() -> Value {
    json!({"status": "complete"})
}

/// Product record served once ingestion completed
pub fn product_json() -> Value {
    json!({"inputid": "0001", "name": "WeatherImg-True-North"})
}

fn probe(url: &str, mock: MockSetup, expected: ExpectedResponse) -> Action {
    Action::Probe(ProbeCase {
        url: url.to_string(),
        mock,
        expected,
    })
}

/// Build the standard suite against the configured endpoints
pub fn builtin_suite(endpoints: &EndpointsConfig) -> Result<Suite, SuiteError> {
    let catalog_url = Endpoint::Catalog.url(endpoints);
    let mut cases = Vec::new();

    for file in [CATALOG_FILE, PRODUCT_FILE] {
        cases.push(
            Case::new(
                format!("s3_uploader[{}]", file),
                Action::Upload {
                    file: file.to_string(),
                },
            )
            .tagged(Tag::Uploader),
        );
    }

    cases.push(
        Case::new(
            "fetch_catalog_ingesting",
            probe(
                catalog_url,
                MockSetup::Respond(MockResponse::new(204).text("ingesting")),
                ExpectedResponse::text(204, "ingesting"),
            ),
        )
        .tagged(Tag::Catalog),
    );

    cases.push(
        Case::new(
            "fetch_catalog_complete",
            probe(
                catalog_url,
                MockSetup::Respond(MockResponse::new(200).json(&complete_json())),
                ExpectedResponse::json(200, complete_json()),
            ),
        )
        .tagged(Tag::Catalog),
    );

    cases.push(
        Case::new(
            "fetch_catalog_not_found",
            probe(
                catalog_url,
                MockSetup::Respond(MockResponse::new(404)),
                ExpectedResponse::status(404),
            ),
        )
        .tagged(Tag::Catalog),
    );

    for endpoint in Endpoint::ALL {
        cases.push(
            Case::new(
                format!("fetch_catalog_products_exception_raising[{}]", endpoint),
                probe(
                    endpoint.url(endpoints),
                    MockSetup::Fail {
                        kind: FailureKind::ReadTimeout,
                        message: "Read timeout failure".to_string(),
                    },
                    ExpectedResponse::failure(FailureMode::ReadTimeout),
                ),
            )
            .tagged(Tag::Catalog),
        );
    }

    for endpoint in Endpoint::ALL {
        cases.push(
            Case::new(
                format!("fetch_catalog_products_timeout[{}]", endpoint),
                probe(
                    endpoint.url(endpoints),
                    MockSetup::None,
                    ExpectedResponse::failure(FailureMode::Timeout),
                ),
            )
            .tagged(Tag::Common),
        );
    }

    // The product record is served from the catalog URL.
    cases.push(
        Case::new(
            "fetch_product_complete",
            probe(
                catalog_url,
                MockSetup::Respond(MockResponse::new(200).json(&product_json())),
                ExpectedResponse::json(200, product_json()),
            ),
        )
        .tagged(Tag::Product)
        .depends_on("fetch_catalog_complete"),
    );

    Suite::new(cases)
}
