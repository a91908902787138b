// src/models/zone.rs

use serde::Serialize;

/// Share of the regional economy per sector, in percent.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EconomicActivities {
    pub agriculture: u8,
    pub industry: u8,
    pub services: u8,
}

/// One of Vietnam's six economic zones.
/// Compiled into the binary; never created or mutated at runtime.
#[derive(Debug, Clone, Serialize)]
pub struct EconomicZone {
    pub id: &'static str,
    pub name: &'static str,
    pub name_vi: &'static str,
    pub region: &'static str,
    pub color: &'static str,
    /// Label anchor as (lat, lng).
    pub coordinates: (f64, f64),
    pub industries: &'static [&'static str],
    pub population: u64,
    /// USD.
    pub gdp: u64,
    /// km².
    pub area: u64,
    pub key_facts: &'static [&'static str],
    pub description: &'static str,
    pub description_vi: &'static str,
    pub established_year: u16,
    pub major_cities: &'static [&'static str],
    pub economic_activities: EconomicActivities,
}

/// Default map viewport.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MapConfig {
    pub center: (f64, f64),
    pub default_zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Zoom applied when a zone gets selected.
    pub selected_zoom: u8,
}

pub const MAP_CONFIG: MapConfig = MapConfig {
    center: (16.0471, 108.2068),
    default_zoom: 6,
    min_zoom: 5,
    max_zoom: 18,
    selected_zoom: 8,
};

/// Zone id -> GADM `NAME_1` province names.
pub const ZONE_PROVINCES: &[(&str, &[&str])] = &[
    (
        "zone-1",
        &[
            "HàGiang", "CaoBằng", "LạngSơn", "BắcGiang", "PhúThọ", "TháiNguyên", "BắcKạn",
            "TuyênQuang", "LàoCai", "YênBái", "LaiChâu", "SơnLa", "ĐiệnBiên", "HoàBình",
        ],
    ),
    (
        "zone-2",
        &[
            "HàNội", "HảiPhòng", "HàNam", "NinhBình", "BắcNinh", "HảiDương", "HưngYên",
            "NamĐịnh", "TháiBình", "VĩnhPhúc", "QuảngNinh",
        ],
    ),
    (
        "zone-3",
        &[
            "ThanhHóa", "NghệAn", "HàTĩnh", "QuảngBình", "QuảngTrị", "ThừaThiênHuế", "ĐàNẵng",
            "QuảngNam", "QuảngNgãi", "BìnhĐịnh", "PhúYên", "KhánhHòa", "NinhThuận", "BìnhThuận",
        ],
    ),
    ("zone-4", &["KonTum", "GiaLai", "ĐắkLắk", "ĐắkNông", "LâmĐồng"]),
    (
        "zone-5",
        &["HồChíMinh", "BàRịa-VũngTàu", "BìnhDương", "BìnhPhước", "ĐồngNai", "TâyNinh"],
    ),
    (
        "zone-6",
        &[
            "CầnThơ", "LongAn", "TiềnGiang", "BếnTre", "VĩnhLong", "TràVinh", "AnGiang",
            "ĐồngTháp", "KiênGiang", "HậuGiang", "SócTrăng", "BạcLiêu", "CàMau",
        ],
    ),
];

pub static ECONOMIC_ZONES: [EconomicZone; 6] = [
    EconomicZone {
        id: "zone-1",
        name: "Northern Mountains and Midlands",
        name_vi: "Trung du và miền núi phía Bắc",
        region: "Northern Vietnam",
        color: "#ef4444",
        coordinates: (21.5, 105.0),
        industries: &["Mining", "Agriculture", "Tourism", "Forestry"],
        population: 12_500_000,
        gdp: 42_000_000_000,
        area: 95_000,
        key_facts: &[
            "Mountainous terrain with diverse ethnic groups",
            "Rich mineral resources including coal and iron",
            "Border trade with China",
            "Traditional agriculture and forestry",
        ],
        description: "The northern mountainous region characterized by diverse economic activities, ethnic diversity, and cross-border trade.",
        description_vi: "Vùng miền núi phía Bắc có địa hình núi đa dạng, nhiều dân tộc và hoạt động kinh tế xuyên biên giới.",
        established_year: 1986,
        major_cities: &["Ha Giang", "Cao Bang", "Lang Son", "Lao Cai"],
        economic_activities: EconomicActivities { agriculture: 35, industry: 45, services: 20 },
    },
    EconomicZone {
        id: "zone-2",
        name: "Red River Delta",
        name_vi: "Đồng bằng sông Hồng",
        region: "Northern Vietnam",
        color: "#f97316",
        coordinates: (21.0285, 105.8542),
        industries: &["Manufacturing", "Technology", "Finance", "Education"],
        population: 23_000_000,
        gdp: 85_000_000_000,
        area: 15_000,
        key_facts: &[
            "Economic and political center of Vietnam",
            "Highest population density in the country",
            "Major industrial and technology hub",
            "Home to capital city Hanoi",
        ],
        description: "The economic heartland of Vietnam, featuring advanced manufacturing, technology sectors, and the capital city.",
        description_vi: "Trung tâm kinh tế của Việt Nam với công nghiệp phát triển, công nghệ cao và thủ đô Hà Nội.",
        established_year: 1986,
        major_cities: &["Hanoi", "Hai Phong", "Nam Dinh", "Thai Binh"],
        economic_activities: EconomicActivities { agriculture: 15, industry: 40, services: 45 },
    },
    EconomicZone {
        id: "zone-3",
        name: "Central Coast",
        name_vi: "Duyên hải miền Trung",
        region: "Central Vietnam",
        color: "#eab308",
        coordinates: (16.0, 107.5),
        industries: &["Heavy Industry", "Tourism", "Steel", "Fishing", "Textiles"],
        population: 20_800_000,
        gdp: 60_000_000_000,
        area: 95_000,
        key_facts: &[
            "Combined coastal region from Thanh Hoa to Binh Thuan",
            "Major heavy industrial and tourism center",
            "Historic imperial capital in Hue",
            "Beautiful beaches and cultural heritage sites",
        ],
        description: "Combined central coastal region featuring heavy industry, tourism, steel production, and rich cultural heritage from Thanh Hoa to Binh Thuan.",
        description_vi: "Vùng duyên hải miền Trung từ Thanh Hóa đến Bình Thuận với công nghiệp nặng, du lịch và di sản văn hóa phong phú.",
        established_year: 1986,
        major_cities: &["Da Nang", "Hue", "Vinh", "Nha Trang", "Thanh Hoa"],
        economic_activities: EconomicActivities { agriculture: 28, industry: 42, services: 30 },
    },
    EconomicZone {
        id: "zone-4",
        name: "Central Highlands",
        name_vi: "Tây Nguyên",
        region: "Central Vietnam",
        color: "#22c55e",
        coordinates: (13.0, 108.0),
        industries: &["Coffee", "Agriculture", "Hydropower", "Forestry"],
        population: 5_800_000,
        gdp: 18_000_000_000,
        area: 54_000,
        key_facts: &[
            "Major coffee producing region",
            "Rich agricultural land",
            "Important hydropower generation",
            "Ethnic minority communities",
        ],
        description: "Agricultural heartland famous for coffee production, hydropower generation, and ethnic cultural diversity.",
        description_vi: "Vùng nông nghiệp nổi tiếng với cà phê, thủy điện và đa dạng văn hóa các dân tộc thiểu số.",
        established_year: 1986,
        major_cities: &["Buon Ma Thuot", "Pleiku", "Kon Tum", "Da Lat"],
        economic_activities: EconomicActivities { agriculture: 55, industry: 25, services: 20 },
    },
    EconomicZone {
        id: "zone-5",
        name: "Southeast",
        name_vi: "Đông Nam Bộ",
        region: "Southern Vietnam",
        color: "#3b82f6",
        coordinates: (10.8, 106.7),
        industries: &["Manufacturing", "Technology", "Finance", "Services"],
        population: 17_500_000,
        gdp: 125_000_000_000,
        area: 23_000,
        key_facts: &[
            "Economic powerhouse of Vietnam",
            "Major manufacturing and technology hub",
            "Home to Ho Chi Minh City",
            "Highest GDP per capita in the country",
        ],
        description: "The economic engine of Vietnam, featuring advanced manufacturing, technology, finance, and services sectors centered around Ho Chi Minh City.",
        description_vi: "Động lực kinh tế của Việt Nam với sản xuất, công nghệ, tài chính và dịch vụ phát triển quanh TP. Hồ Chí Minh.",
        established_year: 1986,
        major_cities: &["Ho Chi Minh City", "Bien Hoa", "Thu Dau Mot", "Vung Tau"],
        economic_activities: EconomicActivities { agriculture: 8, industry: 45, services: 47 },
    },
    EconomicZone {
        id: "zone-6",
        name: "Mekong Delta",
        name_vi: "Đồng bằng sông Cửu Long",
        region: "Southern Vietnam",
        color: "#8b5cf6",
        coordinates: (10.0, 105.5),
        industries: &["Rice Production", "Aquaculture", "Food Processing", "Agriculture"],
        population: 17_200_000,
        gdp: 45_000_000_000,
        area: 40_000,
        key_facts: &[
            "Rice bowl of Vietnam",
            "Largest aquaculture region",
            "Major food processing center",
            "Complex river system and floating markets",
        ],
        description: "Agricultural powerhouse known as the rice bowl of Vietnam, with extensive aquaculture and food processing.",
        description_vi: "Vựa lúa của Việt Nam với nông nghiệp phát triển, nuôi trồng thủy sản và chế biến thực phẩm.",
        established_year: 1986,
        major_cities: &["Can Tho", "Long Xuyen", "Cao Lanh", "Soc Trang"],
        economic_activities: EconomicActivities { agriculture: 60, industry: 20, services: 20 },
    },
];

pub fn find_zone(id: &str) -> Option<&'static EconomicZone> {
    ECONOMIC_ZONES.iter().find(|z| z.id == id)
}
