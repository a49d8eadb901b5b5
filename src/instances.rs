/// Catalogue facts about an instance type, with the Linux on-demand price for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceInfo {
    pub display_name: String,
    pub vcpus: u32,
    pub memory_gib: f32,
    /// Hourly on-demand price in USD, `0.0` when the region has no listed price.
    pub on_demand_hourly: f64,
}

struct CatalogueEntry {
    instance_type: &'static str,
    display_name: &'static str,
    vcpus: u32,
    memory_gib: f32,
    /// (region, Linux on-demand USD/hour)
    pricing: &'static [(&'static str, f64)],
}

const CATALOGUE: &[CatalogueEntry] = &[
    CatalogueEntry {
        instance_type: "t3.micro",
        display_name: "T3 Micro",
        vcpus: 2,
        memory_gib: 1.0,
        pricing: &[
            ("us-east-1", 0.0104),
            ("us-west-2", 0.0104),
            ("eu-west-1", 0.0114),
            ("ap-southeast-2", 0.0132),
        ],
    },
    CatalogueEntry {
        instance_type: "t3.large",
        display_name: "T3 Large",
        vcpus: 2,
        memory_gib: 8.0,
        pricing: &[
            ("us-east-1", 0.0832),
            ("us-west-2", 0.0832),
            ("eu-west-1", 0.0912),
            ("ap-southeast-2", 0.1056),
        ],
    },
    CatalogueEntry {
        instance_type: "c4.large",
        display_name: "C4 High-CPU Large",
        vcpus: 2,
        memory_gib: 3.75,
        pricing: &[
            ("us-east-1", 0.100),
            ("us-west-2", 0.100),
            ("eu-west-1", 0.113),
            ("ap-southeast-2", 0.130),
        ],
    },
    CatalogueEntry {
        instance_type: "c4.xlarge",
        display_name: "C4 High-CPU Extra Large",
        vcpus: 4,
        memory_gib: 7.5,
        pricing: &[
            ("us-east-1", 0.199),
            ("us-west-2", 0.199),
            ("eu-west-1", 0.226),
            ("ap-southeast-2", 0.261),
        ],
    },
    CatalogueEntry {
        instance_type: "c5.large",
        display_name: "C5 High-CPU Large",
        vcpus: 2,
        memory_gib: 4.0,
        pricing: &[
            ("us-east-1", 0.085),
            ("us-west-2", 0.085),
            ("eu-west-1", 0.096),
            ("ap-southeast-2", 0.111),
        ],
    },
    CatalogueEntry {
        instance_type: "m4.large",
        display_name: "M4 Large",
        vcpus: 2,
        memory_gib: 8.0,
        pricing: &[
            ("us-east-1", 0.100),
            ("us-west-2", 0.100),
            ("eu-west-1", 0.111),
            ("ap-southeast-2", 0.125),
        ],
    },
    CatalogueEntry {
        instance_type: "m5.large",
        display_name: "M5 General Purpose Large",
        vcpus: 2,
        memory_gib: 8.0,
        pricing: &[
            ("us-east-1", 0.096),
            ("us-west-2", 0.096),
            ("eu-west-1", 0.107),
            ("ap-southeast-2", 0.120),
        ],
    },
    CatalogueEntry {
        instance_type: "m5.xlarge",
        display_name: "M5 General Purpose Extra Large",
        vcpus: 4,
        memory_gib: 16.0,
        pricing: &[
            ("us-east-1", 0.192),
            ("us-west-2", 0.192),
            ("eu-west-1", 0.214),
            ("ap-southeast-2", 0.240),
        ],
    },
    CatalogueEntry {
        instance_type: "r5.large",
        display_name: "R5 Memory Optimized Large",
        vcpus: 2,
        memory_gib: 16.0,
        pricing: &[
            ("us-east-1", 0.126),
            ("us-west-2", 0.126),
            ("eu-west-1", 0.141),
            ("ap-southeast-2", 0.151),
        ],
    },
];

/// Look up `instance_type`. Unknown types return `None`; a known type without pricing for
/// `region` comes back with a zero on-demand price.
pub fn lookup(region: &str, instance_type: &str) -> Option<InstanceInfo> {
    let entry = CATALOGUE
        .iter()
        .find(|entry| entry.instance_type == instance_type)?;

    let on_demand_hourly = entry
        .pricing
        .iter()
        .find(|(priced_region, _)| *priced_region == region)
        .map(|(_, price)| *price)
        .unwrap_or(0.0);

    Some(InstanceInfo {
        display_name: entry.display_name.to_string(),
        vcpus: entry.vcpus,
        memory_gib: entry.memory_gib,
        on_demand_hourly,
    })
}

/// Every instance type in the catalogue, in table order.
pub fn known_instance_types() -> impl Iterator<Item = &'static str> {
    CATALOGUE.iter().map(|entry| entry.instance_type)
}
