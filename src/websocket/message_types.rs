use serde::{Deserialize, Serialize};

/// Inbound dashboard WebSocket messages (browser -> server).
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DashboardInbound {
    #[serde(rename = "auth")]
    Auth { token: String },
    /// Fully replaces the client's subscription; an empty list means
    /// "all printers for this tenant".
    #[serde(rename = "subscribe")]
    Subscribe { printers: Vec<String> },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperatures {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nozzle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chamber: Option<f64>,
}

/// Outbound dashboard WebSocket messages (server -> browser).
///
/// Also used as the normalized event payload on the print-events queue, so
/// the queue path and the direct-push path carry the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DashboardOutbound {
    #[serde(rename = "auth_success")]
    AuthSuccess,
    #[serde(rename = "auth_error")]
    AuthError { error: String },
    #[serde(rename = "printer_status")]
    PrinterStatus {
        printer_id: String,
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        progress_percentage: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        remaining_time_seconds: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_layer: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        total_layers: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        temperatures: Option<Temperatures>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
    },
    #[serde(rename = "hub_status")]
    HubStatus { hub_id: String, is_online: bool },
    #[serde(rename = "job_update")]
    JobUpdate {
        job_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stage: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        progress_percentage: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        printer_id: Option<String>,
    },
    #[serde(rename = "inventory_alert")]
    InventoryAlert {
        sku_id: String,
        sku: String,
        current_stock: i64,
        threshold: i64,
    },
    #[serde(rename = "new_order")]
    NewOrder {
        order_id: String,
        order_number: String,
        platform: String,
        total_items: i64,
    },
}

impl DashboardOutbound {
    pub fn event_type(&self) -> &'static str {
        match self {
            DashboardOutbound::AuthSuccess => "auth_success",
            DashboardOutbound::AuthError { .. } => "auth_error",
            DashboardOutbound::PrinterStatus { .. } => "printer_status",
            DashboardOutbound::HubStatus { .. } => "hub_status",
            DashboardOutbound::JobUpdate { .. } => "job_update",
            DashboardOutbound::InventoryAlert { .. } => "inventory_alert",
            DashboardOutbound::NewOrder { .. } => "new_order",
        }
    }

    /// The printer/hub key this event targets, used for subscription
    /// filtering. Events without a scope go to every authenticated client.
    pub fn scope(&self) -> Option<&str> {
        match self {
            DashboardOutbound::PrinterStatus { printer_id, .. } => Some(printer_id),
            DashboardOutbound::HubStatus { hub_id, .. } => Some(hub_id),
            DashboardOutbound::JobUpdate { printer_id, .. } => printer_id.as_deref(),
            _ => None,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to serialize outbound frame");
            String::new()
        })
    }
}

/// Telemetry frames sent by a hub over its WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum TelemetryFrame {
    #[serde(rename = "printer_status")]
    PrinterStatus {
        printer_id: String,
        status: String,
        progress_percentage: Option<f64>,
        remaining_time_seconds: Option<i64>,
        current_layer: Option<i32>,
        total_layers: Option<i32>,
        temperatures: Option<Temperatures>,
        error_message: Option<String>,
    },
    #[serde(rename = "job_update")]
    JobUpdate {
        job_id: String,
        status: Option<String>,
        stage: Option<String>,
        progress_percentage: Option<f64>,
        error: Option<String>,
        printer_id: Option<String>,
    },
    #[serde(rename = "error")]
    Error {
        printer_id: String,
        message: String,
    },
}

impl TelemetryFrame {
    /// Normalizes a raw telemetry frame into the dashboard event shape.
    /// Error frames become a printer_status with status "error" so that
    /// dashboards have a single printer-state stream to render.
    pub fn normalize(self) -> DashboardOutbound {
        match self {
            TelemetryFrame::PrinterStatus {
                printer_id,
                status,
                progress_percentage,
                remaining_time_seconds,
                current_layer,
                total_layers,
                temperatures,
                error_message,
            } => DashboardOutbound::PrinterStatus {
                printer_id,
                status,
                progress_percentage,
                remaining_time_seconds,
                current_layer,
                total_layers,
                temperatures,
                error_message,
            },
            TelemetryFrame::JobUpdate {
                job_id,
                status,
                stage,
                progress_percentage,
                error,
                printer_id,
            } => DashboardOutbound::JobUpdate {
                job_id,
                status,
                stage,
                progress_percentage,
                error,
                printer_id,
            },
            TelemetryFrame::Error {
                printer_id,
                message,
            } => DashboardOutbound::PrinterStatus {
                printer_id,
                status: "error".into(),
                progress_percentage: None,
                remaining_time_seconds: None,
                current_layer: None,
                total_layers: None,
                temperatures: None,
                error_message: Some(message),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_auth_parses() {
        let msg: DashboardInbound =
            serde_json::from_str(r#"{"type":"auth","token":"abc"}"#).unwrap();
        assert!(matches!(msg, DashboardInbound::Auth { token } if token == "abc"));
    }

    #[test]
    fn inbound_unknown_type_is_an_error() {
        assert!(serde_json::from_str::<DashboardInbound>(r#"{"type":"bogus"}"#).is_err());
    }

    #[test]
    fn printer_status_omits_absent_fields() {
        let frame = DashboardOutbound::PrinterStatus {
            printer_id: "p1".into(),
            status: "printing".into(),
            progress_percentage: Some(42.0),
            remaining_time_seconds: None,
            current_layer: None,
            total_layers: None,
            temperatures: None,
            error_message: None,
        };
        let json = frame.to_json();
        assert!(json.contains(r#""type":"printer_status""#));
        assert!(json.contains(r#""progress_percentage":42.0"#));
        assert!(!json.contains("remaining_time_seconds"));
        assert!(!json.contains("temperatures"));
    }

    #[test]
    fn error_frame_normalizes_to_printer_status() {
        let frame: TelemetryFrame = serde_json::from_str(
            r#"{"type":"error","printer_id":"p9","message":"thermal runaway"}"#,
        )
        .unwrap();
        match frame.normalize() {
            DashboardOutbound::PrinterStatus {
                printer_id,
                status,
                error_message,
                ..
            } => {
                assert_eq!(printer_id, "p9");
                assert_eq!(status, "error");
                assert_eq!(error_message.as_deref(), Some("thermal runaway"));
            }
            other => panic!("unexpected normalization: {other:?}"),
        }
    }

    #[test]
    fn scope_targets_printer_and_hub_events() {
        let status = DashboardOutbound::HubStatus {
            hub_id: "hub-1".into(),
            is_online: true,
        };
        assert_eq!(status.scope(), Some("hub-1"));

        let order = DashboardOutbound::NewOrder {
            order_id: "o1".into(),
            order_number: "1001".into(),
            platform: "shopify".into(),
            total_items: 3,
        };
        assert_eq!(order.scope(), None);
    }
}
