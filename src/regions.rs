//! Static catalog of regions and the object storage clusters they host.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub id: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cluster {
    pub id: &'static str,
    pub region: &'static str,
    pub domain: &'static str,
}

const REGIONS: &[Region] = &[
    Region { id: "us-east", label: "Newark, NJ" },
    Region { id: "us-southeast", label: "Atlanta, GA" },
    Region { id: "us-ord", label: "Chicago, IL" },
    Region { id: "eu-central", label: "Frankfurt, DE" },
    Region { id: "ap-south", label: "Singapore, SG" },
    Region { id: "local", label: "Local" },
];

const CLUSTERS: &[Cluster] = &[
    Cluster { id: "us-east-1", region: "us-east", domain: "us-east-1.cloudshelf.local" },
    Cluster { id: "us-southeast-1", region: "us-southeast", domain: "us-southeast-1.cloudshelf.local" },
    Cluster { id: "us-ord-1", region: "us-ord", domain: "us-ord-1.cloudshelf.local" },
    Cluster { id: "eu-central-1", region: "eu-central", domain: "eu-central-1.cloudshelf.local" },
    Cluster { id: "ap-south-1", region: "ap-south", domain: "ap-south-1.cloudshelf.local" },
    Cluster { id: "local-1", region: "local", domain: "localhost" },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog;

impl Catalog {
    pub fn region(&self, id: &str) -> Option<&'static Region> {
        REGIONS.iter().find(|r| r.id == id)
    }

    pub fn cluster(&self, id: &str) -> Option<&'static Cluster> {
        CLUSTERS.iter().find(|c| c.id == id)
    }

    /// Region hosting a cluster.
    pub fn region_for_cluster(&self, cluster: &str) -> Option<&'static Region> {
        self.cluster(cluster).and_then(|c| self.region(c.region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_cluster_maps_to_a_region() {
        let catalog = Catalog;
        for cluster in CLUSTERS {
            assert!(catalog.region_for_cluster(cluster.id).is_some(), "{}", cluster.id);
        }
        assert_eq!(catalog.region_for_cluster("us-east-1").map(|r| r.label), Some("Newark, NJ"));
        assert!(catalog.region_for_cluster("mars-1").is_none());
    }
}
