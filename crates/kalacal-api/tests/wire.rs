use kalacal_api::{ChartImage, PredictResponse};

// "PNG" in base64.
const PNG_URI: &str = "data:image/png;base64,UE5H";

#[test]
fn predict_response_decodes_server_field_names() {
    let json = r#"{
        "valor_predito": 12.5,
        "erro_modelo": 16.7,
        "imagem_base64": "data:image/png;base64,UE5H",
        "variaveis": ["Idademeses", "edema", "peso"],
        "abordagem": "clinicas",
        "total_features": 3
    }"#;

    let response: PredictResponse = serde_json::from_str(json).unwrap();
    assert!((response.predicted_value - 12.5).abs() < f64::EPSILON);
    assert!((response.model_error - 16.7).abs() < f64::EPSILON);
    assert_eq!(response.variables, ["Idademeses", "edema", "peso"]);
    assert_eq!(response.approach.as_deref(), Some("clinicas"));
    assert_eq!(response.total_features, Some(3));
}

#[test]
fn optional_metadata_may_be_absent() {
    let json = r#"{"valor_predito": 1, "erro_modelo": 2, "imagem_base64": "UE5H", "variaveis": []}"#;
    let response: PredictResponse = serde_json::from_str(json).unwrap();
    assert_eq!(response.approach, None);
    assert_eq!(response.total_features, None);
}

#[test]
fn chart_data_uri_decodes_to_bytes() {
    let chart = ChartImage::new(PNG_URI);
    assert_eq!(chart.mime_type(), "image/png");
    assert_eq!(chart.decode().unwrap(), b"PNG");
}

#[test]
fn bare_base64_chart_is_treated_as_png() {
    let chart = ChartImage::new("UE5H");
    assert_eq!(chart.mime_type(), "image/png");
    assert_eq!(chart.decode().unwrap(), b"PNG");
}

#[test]
fn malformed_chart_is_rejected() {
    assert!(ChartImage::new("data:image/png;base64").decode().is_err());
    assert!(ChartImage::new("data:image/svg+xml,<svg/>").decode().is_err());
    assert!(ChartImage::new("data:image/png;base64,!!!").decode().is_err());
}
