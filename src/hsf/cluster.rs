use tracing::{debug, warn};

use crate::hsf::types::{Cluster, Model};

fn adjust(clusters: &mut [Cluster<'_>], target: &Model<'_>) -> usize {
    let mut adjusted = 0;
    for (i, cluster) in clusters.iter_mut().enumerate() {
        if cluster.adjusted {
            continue;
        }
        cluster.adjusted = true;
        adjusted += 1;

        cluster.target = match cluster.target_name {
            Some(name) => {
                let found = target.find_object(name);
                if found.is_none() {
                    warn!(cluster = i, "search object error: {name}");
                }
                found
            }
            None => {
                debug!(cluster = i, "cluster has no target name");
                None
            }
        };
    }
    adjusted
}

/// Point `source`'s clusters at objects of `target`, matched by the cluster's
/// target name.
///
/// Each cluster is adjusted at most once; later calls leave already adjusted
/// clusters alone even when given a different target. Returns how many
/// clusters were adjusted by this call.
pub fn adjust_cluster_targets(target: &Model<'_>, source: &mut Model<'_>) -> usize {
    adjust(&mut source.clusters, target)
}

impl Model<'_> {
    /// [`adjust_cluster_targets`] with the model acting as its own target.
    pub fn adjust_own_cluster_targets(&mut self) -> usize {
        // Lookups only read the object table.
        let mut clusters = std::mem::take(&mut self.clusters);
        let adjusted = adjust(&mut clusters, self);
        self.clusters = clusters;
        adjusted
    }
}
