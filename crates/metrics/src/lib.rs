use anyhow::Result;
use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server,
};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::net::SocketAddr;
use tracing::info;

#[derive(Clone)]
pub struct MetricsHandle {
    registry: Registry,
    poll_cycles: IntCounter,
    poll_failures: IntCounter,
    snapshots_published: IntCounter,
    connected_clients: IntGauge,
}

impl MetricsHandle {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let poll_cycles =
            IntCounter::new("offerd_poll_cycles_total", "Poll cycles attempted")?;
        let poll_failures = IntCounter::new(
            "offerd_poll_failures_total",
            "Poll cycles that failed to read the offer store",
        )?;
        let snapshots_published = IntCounter::new(
            "offerd_snapshots_published_total",
            "Offer snapshots published to the broadcast channel",
        )?;
        let connected_clients = IntGauge::new(
            "offerd_connected_clients",
            "Dashboard WebSocket clients currently connected",
        )?;

        registry.register(Box::new(poll_cycles.clone()))?;
        registry.register(Box::new(poll_failures.clone()))?;
        registry.register(Box::new(snapshots_published.clone()))?;
        registry.register(Box::new(connected_clients.clone()))?;

        Ok(Self {
            registry,
            poll_cycles,
            poll_failures,
            snapshots_published,
            connected_clients,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn poll_cycles(&self) -> &IntCounter {
        &self.poll_cycles
    }

    pub fn poll_failures(&self) -> &IntCounter {
        &self.poll_failures
    }

    pub fn snapshots_published(&self) -> &IntCounter {
        &self.snapshots_published
    }

    pub fn connected_clients(&self) -> &IntGauge {
        &self.connected_clients
    }

    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let registry = self.registry.clone();
        let make_svc = make_service_fn(move |_| {
            let registry = registry.clone();
            async move {
                Ok::<_, hyper::Error>(service_fn(move |_req: Request<Body>| {
                    let registry = registry.clone();
                    async move {
                        let encoder = TextEncoder::new();
                        let metric_families = registry.gather();
                        let mut buffer = Vec::new();
                        if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
                            tracing::warn!(error = ?err, "metrics encode failed");
                        }
                        Response::builder()
                            .status(200)
                            .header("Content-Type", encoder.format_type())
                            .body(Body::from(buffer))
                            .map_err(|err| {
                                tracing::warn!(error = ?err, "metrics response build failed");
                                err
                            })
                            .or_else(|_| Ok::<_, hyper::Error>(Response::new(Body::empty())))
                    }
                }))
            }
        });

        let server = Server::bind(&addr).serve(make_svc);
        info!(%addr, "metrics exporter listening");
        server.await?;
        Ok(())
    }
}
