//! HTTP handler functions for the crime prediction API.

use actix_web::{HttpResponse, web};
use crime_predict_location_models::Coordinate;
use crime_predict_server_models::{
    ApiError, ApiHealth, ApiLocationCode, ApiPredictResponse, PredictRequest,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/location-codes`
///
/// Returns the location code table in lookup order.
pub async fn location_codes(state: web::Data<AppState>) -> HttpResponse {
    let codes: Vec<ApiLocationCode> = state
        .pipeline
        .resolver()
        .table()
        .entries()
        .iter()
        .map(ApiLocationCode::from)
        .collect();
    HttpResponse::Ok().json(codes)
}

/// `POST /api/predict`
///
/// Resolves the clicked coordinate and, if it maps to a location code,
/// scores it. Unmapped clicks still return 200 with the "could not map"
/// line; only model failures are errors.
pub async fn predict(
    state: web::Data<AppState>,
    body: web::Json<PredictRequest>,
) -> HttpResponse {
    let request = body.into_inner();

    let coordinate = match Coordinate::new(request.latitude, request.longitude) {
        Ok(c) => c,
        Err(e) => {
            return HttpResponse::BadRequest().json(ApiError {
                error: e.to_string(),
            });
        }
    };

    match state
        .pipeline
        .handle_click(coordinate, &request.features)
        .await
    {
        Ok(report) => {
            for line in report.lines() {
                log::info!("{line}");
            }
            HttpResponse::Ok().json(ApiPredictResponse::from(report))
        }
        Err(e) => {
            log::error!("Failed to predict for {coordinate}: {e}");
            HttpResponse::InternalServerError().json(ApiError {
                error: "Failed to predict crime likelihood".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, test, web};
    use async_trait::async_trait;
    use crime_predict_geocoder::{GeocodeError, ReverseGeocodedAddress, ReverseGeocoder};
    use crime_predict_location::LocationResolver;
    use crime_predict_location_models::{Coordinate, LocationCodeTable, MatchPolicy};
    use crime_predict_model::{CrimeModel, FeatureDefaults, FeatureRecord, ModelError};
    use crime_predict_pipeline::{ClickPipeline, PredictionInvoker};
    use crime_predict_server_models::{ApiLocationCode, ApiPredictResponse};

    use crate::AppState;

    struct FixedPostcode(&'static str);

    #[async_trait]
    impl ReverseGeocoder for FixedPostcode {
        async fn reverse(
            &self,
            _coordinate: Coordinate,
        ) -> Result<Option<ReverseGeocodedAddress>, GeocodeError> {
            let mut address = ReverseGeocodedAddress::default();
            address
                .address
                .insert("postcode".to_string(), self.0.to_string());
            Ok(Some(address))
        }
    }

    struct ConstantModel(f64);

    impl CrimeModel for ConstantModel {
        fn predict(&self, _record: &FeatureRecord) -> Result<f64, ModelError> {
            Ok(self.0)
        }
    }

    fn state(postcode: &'static str) -> web::Data<AppState> {
        let resolver = LocationResolver::new(
            Arc::new(FixedPostcode(postcode)),
            Arc::new(LocationCodeTable::default_table()),
            MatchPolicy::Substring,
        );
        let invoker =
            PredictionInvoker::new(Arc::new(ConstantModel(0.61)), FeatureDefaults::default());
        web::Data::new(AppState {
            pipeline: ClickPipeline::new(resolver, invoker),
        })
    }

    #[actix_web::test]
    async fn predict_returns_score_for_mapped_click() {
        let app = test::init_service(
            App::new()
                .app_data(state("87G8R3PJ+99"))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(serde_json::json!({ "latitude": 40.7128, "longitude": -74.006 }))
            .to_request();
        let resp: ApiPredictResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp.location_key.as_deref(), Some("87G8R3PJ+"));
        assert_eq!(resp.location_code, 0);
        let prediction = resp.prediction.unwrap();
        assert!((prediction.score - 0.61).abs() < f64::EPSILON);
        assert_eq!(prediction.features.location_code, 0);
        assert_eq!(
            resp.lines.last().map(String::as_str),
            Some("Predicted Crime Likelihood: 0.61")
        );
    }

    #[actix_web::test]
    async fn predict_reports_unmapped_click() {
        let app = test::init_service(
            App::new()
                .app_data(state("00000"))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(serde_json::json!({ "latitude": 0.0, "longitude": 0.0 }))
            .to_request();
        let resp: ApiPredictResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp.location_key, None);
        assert_eq!(resp.location_code, -1);
        assert!(resp.prediction.is_none());
        assert_eq!(
            resp.lines,
            vec!["Could not map location to crime prediction.".to_string()]
        );
    }

    #[actix_web::test]
    async fn predict_accepts_training_column_overrides() {
        let app = test::init_service(
            App::new()
                .app_data(state("87G8R3PJ+99"))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(serde_json::json!({
                "latitude": 40.7128,
                "longitude": -74.006,
                "features": { "ADDR_PCT_CD": 75 }
            }))
            .to_request();
        let resp: ApiPredictResponse = test::call_and_read_body_json(&app, req).await;

        let prediction = resp.prediction.unwrap();
        assert_eq!(prediction.features.address_precinct, 75);
        assert_eq!(prediction.features.hour, 15);
    }

    #[actix_web::test]
    async fn predict_rejects_unknown_feature_keys() {
        let app = test::init_service(
            App::new()
                .app_data(state("87G8R3PJ+99"))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(serde_json::json!({
                "latitude": 40.7128,
                "longitude": -74.006,
                "features": { "precinct": 75 }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn lists_location_codes() {
        let app = test::init_service(
            App::new()
                .app_data(state("00000"))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/location-codes").to_request();
        let codes: Vec<ApiLocationCode> = test::call_and_read_body_json(&app, req).await;

        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].key, "87G8R3PJ+");
        assert_eq!(codes[0].code, 0);
    }
}
