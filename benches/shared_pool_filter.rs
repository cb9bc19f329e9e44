//! Benchmark for the shared-pool filter
//!
//! Measures `list` throughput through the filter on a node with many pods.

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rte_inventory::domain::podresources::{
    AllocatableResourcesRequest, AllocatableResourcesResponse, ContainerResources,
    ListPodResourcesRequest, ListPodResourcesResponse, PodResources,
};
use rte_inventory::{ContainerIdent, PodResourcesProvider, Result, SharedPoolFilter};
use std::sync::Arc;

struct StaticProvider {
    listing: ListPodResourcesResponse,
}

#[async_trait]
impl PodResourcesProvider for StaticProvider {
    async fn list(&self, _request: ListPodResourcesRequest) -> Result<ListPodResourcesResponse> {
        Ok(self.listing.clone())
    }

    async fn get_allocatable_resources(
        &self,
        _request: AllocatableResourcesRequest,
    ) -> Result<AllocatableResourcesResponse> {
        Ok(AllocatableResourcesResponse::default())
    }

    fn provider_name(&self) -> &str {
        "static"
    }
}

/// `pods` pods of four containers; every container holds the shared pool
/// (cpus 0-31) plus two exclusive cpus
fn listing(pods: usize) -> ListPodResourcesResponse {
    let shared: Vec<i64> = (0..32).collect();
    let mut pod_resources = vec![PodResources {
        name: "ref-pod".into(),
        namespace: "kube-system".into(),
        containers: vec![ContainerResources {
            name: "ref-cnt".into(),
            devices: Vec::new(),
            cpu_ids: shared.clone(),
        }],
    }];

    for p in 0..pods {
        let containers = (0..4)
            .map(|c| {
                let base = 32 + ((p * 4 + c) as i64 % 96) * 2;
                let mut cpu_ids = shared.clone();
                cpu_ids.extend([base, base + 1]);
                ContainerResources {
                    name: format!("cnt-{}", c),
                    devices: Vec::new(),
                    cpu_ids,
                }
            })
            .collect();
        pod_resources.push(PodResources {
            name: format!("pod-{}", p),
            namespace: "default".into(),
            containers,
        });
    }

    ListPodResourcesResponse { pod_resources }
}

fn bench_filter_list(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime");

    let mut group = c.benchmark_group("shared_pool_filter");

    for pods in [10usize, 100, 1000] {
        let filter = SharedPoolFilter::new(
            Arc::new(StaticProvider {
                listing: listing(pods),
            }),
            Some(ContainerIdent::new("kube-system", "ref-pod", "ref-cnt")),
        );

        group.throughput(Throughput::Elements(pods as u64));
        group.bench_function(format!("list_{}_pods", pods), |b| {
            b.iter(|| {
                let resp = runtime
                    .block_on(filter.list(black_box(ListPodResourcesRequest::default())))
                    .expect("list");
                black_box(resp);
            });
        });
    }

    group.finish();
}

fn bench_filter_passthrough(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime");

    let filter = SharedPoolFilter::new(
        Arc::new(StaticProvider {
            listing: listing(100),
        }),
        None,
    );

    c.bench_function("shared_pool_filter/no_reference_100_pods", |b| {
        b.iter(|| {
            let resp = runtime
                .block_on(filter.list(black_box(ListPodResourcesRequest::default())))
                .expect("list");
            black_box(resp);
        });
    });
}

criterion_group!(benches, bench_filter_list, bench_filter_passthrough);
criterion_main!(benches);
