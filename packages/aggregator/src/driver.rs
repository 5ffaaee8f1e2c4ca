//! Event loop connecting live subscriptions to a render surface.

use nearmiss_map_report_models::{Annoyance, Incident};
use tokio::sync::watch;

use crate::{RenderedReports, ReportAggregator, ReportFilters};

/// Render surface for the merged report layer.
pub trait ReportSink: Send + Sync {
    /// Replaces the layer contents and count text.
    fn render(&self, rendered: &RenderedReports);
}

/// Recomputes and renders on every event from any input stream until the
/// report streams close.
///
/// Renders once up front with whatever the channels currently hold. The
/// two report streams are independent; each event recomputes from the
/// latest value of all three inputs. A closed filter stream leaves the
/// last filters in place.
pub async fn run_aggregator(
    mut incidents: watch::Receiver<Vec<Incident>>,
    mut annoyances: watch::Receiver<Vec<Annoyance>>,
    mut filters: watch::Receiver<ReportFilters>,
    sink: &dyn ReportSink,
) {
    let mut aggregator = ReportAggregator::new();
    aggregator.set_incidents(incidents.borrow_and_update().clone());
    aggregator.set_annoyances(annoyances.borrow_and_update().clone());
    aggregator.set_filters(filters.borrow_and_update().clone());
    sink.render(&aggregator.render());

    let mut filters_open = true;

    loop {
        tokio::select! {
            changed = incidents.changed() => {
                if changed.is_err() {
                    log::debug!("Incident stream closed");
                    break;
                }
                aggregator.set_incidents(incidents.borrow_and_update().clone());
            }
            changed = annoyances.changed() => {
                if changed.is_err() {
                    log::debug!("Annoyance stream closed");
                    break;
                }
                aggregator.set_annoyances(annoyances.borrow_and_update().clone());
            }
            changed = filters.changed(), if filters_open => {
                if changed.is_err() {
                    filters_open = false;
                    continue;
                }
                aggregator.set_filters(filters.borrow_and_update().clone());
            }
        }

        let rendered = aggregator.render();
        log::trace!("Rendering {}", rendered.count_text);
        sink.render(&rendered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearmiss_map_report_models::{
        IncidentType, LngLat, ReportKind, ReportStatus, Scariness,
    };
    use tokio::sync::mpsc;

    struct ChannelSink(mpsc::UnboundedSender<String>);

    impl ReportSink for ChannelSink {
        fn render(&self, rendered: &RenderedReports) {
            let _ = self.0.send(rendered.count_text.clone());
        }
    }

    fn approved_incident(id: &str) -> Incident {
        let mut r = Incident::new(
            LngLat::new(144.96, -37.81),
            IncidentType::HeadOn,
            Scariness::FairlyScary,
            "Oncoming car crossed the centre line",
        );
        r.id = id.to_string();
        r.status = ReportStatus::Approved;
        r
    }

    #[tokio::test]
    async fn renders_on_every_stream_event() {
        let (incident_tx, incident_rx) = watch::channel(Vec::new());
        let (annoyance_tx, annoyance_rx) = watch::channel(Vec::<Annoyance>::new());
        let (filter_tx, filter_rx) = watch::channel(ReportFilters::default());
        let (render_tx, mut renders) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            let sink = ChannelSink(render_tx);
            run_aggregator(incident_rx, annoyance_rx, filter_rx, &sink).await;
        });

        assert_eq!(renders.recv().await.as_deref(), Some("0 reports"));

        incident_tx.send_replace(vec![approved_incident("i1")]);
        assert_eq!(renders.recv().await.as_deref(), Some("1 incident"));

        filter_tx.send_replace(ReportFilters {
            kind: Some(ReportKind::Annoyance),
            ..ReportFilters::default()
        });
        assert_eq!(renders.recv().await.as_deref(), Some("0 annoyances"));

        // Closing the filter stream alone keeps the loop running.
        drop(filter_tx);
        incident_tx.send_replace(Vec::new());
        assert_eq!(renders.recv().await.as_deref(), Some("0 annoyances"));

        drop(incident_tx);
        handle.await.unwrap();
        drop(annoyance_tx);
    }
}
