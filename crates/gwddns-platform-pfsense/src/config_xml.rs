//! config.xml reading
//!
//! pfSense keeps its whole configuration in one XML document. Only a handful
//! of sections matter here, so the document is loaded into a small element
//! tree and queried by element name:
//!
//! ```text
//! <pfsense>
//!   <gateways>
//!     <latencyhigh>500</latencyhigh>          platform default
//!     <losshigh>20</losshigh>                 platform default
//!     <gateway_item>
//!       <name>WAN_DHCP</name> <interface>wan</interface>
//!       <latencyhigh>300</latencyhigh>        optional override
//!     </gateway_item>
//!   </gateways>
//!   <interfaces>
//!     <wan><if>em0</if></wan>  <opt1><if>ixl2</if></opt1>
//!   </interfaces>
//!   <dyndnses>
//!     <dyndns>
//!       <type>custom</type> <interface>wan</interface> <id>0</id> <enable/>
//!     </dyndns>
//!   </dyndnses>
//! </pfsense>
//! ```

use std::collections::HashMap;

use gwddns_core::health::{ThresholdConfig, ThresholdOverride};
use gwddns_core::{Error, Result};
use tracing::warn;
use xml::reader::{EventReader, XmlEvent};

/// One XML element with its concatenated text and child elements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn named(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// Parse a whole document and return its root element
    pub fn parse(source: &str) -> Result<Element> {
        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;

        for event in EventReader::new(source.as_bytes()) {
            let event = event.map_err(|e| Error::platform(format!("config.xml parse error: {}", e)))?;
            match event {
                XmlEvent::StartElement { name, .. } => stack.push(Element::named(name.local_name)),
                XmlEvent::Characters(text) | XmlEvent::CData(text) => {
                    if let Some(open) = stack.last_mut() {
                        open.text.push_str(&text);
                    }
                }
                XmlEvent::EndElement { .. } => {
                    if let Some(done) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(done),
                            None => root = Some(done),
                        }
                    }
                }
                _ => {}
            }
        }

        root.ok_or_else(|| Error::platform("config.xml has no root element"))
    }

    /// First direct child called `name`
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Direct children called `name`
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first child called `name`; empty text counts as absent
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|text| !text.is_empty())
    }

    /// Every element called `name` below this one, depth first
    pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }
}

/// The parts of config.xml the adapter reads
#[derive(Debug, Clone)]
pub struct ConfigXml {
    root: Element,
}

impl ConfigXml {
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self {
            root: Element::parse(source)?,
        })
    }

    fn gateway_items(&self) -> impl Iterator<Item = &Element> {
        self.root
            .descendants("gateways")
            .into_iter()
            .flat_map(|gateways| gateways.children_named("gateway_item"))
    }

    fn dyndns_entries(&self) -> impl Iterator<Item = &Element> {
        self.root
            .descendants("dyndnses")
            .into_iter()
            .flat_map(|section| section.children_named("dyndns"))
    }

    /// Platform defaults from the first `<gateways>` section plus per-gateway
    /// settings from every `<gateway_item>` with a name
    pub fn thresholds(&self) -> ThresholdConfig {
        let mut config = ThresholdConfig::default();

        if let Some(gateways) = self.root.descendants("gateways").first() {
            config.defaults = read_override(gateways, "gateways");
        }

        for item in self.gateway_items() {
            if let Some(name) = item.child_text("name") {
                config
                    .gateways
                    .insert(name.to_string(), read_override(item, name));
            }
        }

        config
    }

    /// gateway name → logical interface
    pub fn gateway_interfaces(&self) -> HashMap<String, String> {
        self.gateway_items()
            .filter_map(|item| {
                Some((
                    item.child_text("name")?.to_string(),
                    item.child_text("interface")?.to_string(),
                ))
            })
            .collect()
    }

    /// physical interface → logical interface, for `wan`, `lan` and `optN`
    pub fn physical_to_logical(&self) -> HashMap<String, String> {
        self.root
            .descendants("interfaces")
            .into_iter()
            .flat_map(|section| section.children.iter())
            .filter(|iface| is_assignable(&iface.name))
            .filter_map(|iface| Some((iface.child_text("if")?.to_string(), iface.name.clone())))
            .collect()
    }

    /// logical interface → entry id, for `custom` DynDNS entries
    pub fn cache_ids(&self) -> HashMap<String, String> {
        self.dyndns_entries()
            .filter(|entry| entry.child_text("type") == Some("custom"))
            .filter_map(|entry| {
                Some((
                    entry.child_text("interface")?.to_string(),
                    entry.child_text("id")?.to_string(),
                ))
            })
            .collect()
    }

    /// Whether an enabled DynDNS entry uses an IPv6 service type
    pub fn ipv6_dyndns_configured(&self) -> bool {
        self.dyndns_entries().any(|entry| {
            entry.child("enable").is_some()
                && entry
                    .child_text("type")
                    .is_some_and(|t| t.to_lowercase().contains("-v6"))
        })
    }
}

fn is_assignable(tag: &str) -> bool {
    tag == "wan" || tag == "lan" || tag.starts_with("opt")
}

fn read_override(element: &Element, owner: &str) -> ThresholdOverride {
    ThresholdOverride {
        latency_high_ms: read_number(element, "latencyhigh", owner),
        loss_high_pct: read_number(element, "losshigh", owner),
    }
}

fn read_number(element: &Element, field: &str, owner: &str) -> Option<u32> {
    let text = element.child_text(field)?;
    match text.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring non-numeric {} '{}' for {}", field, text, owner);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<pfsense>
  <interfaces>
    <wan><if>em0</if><descr><![CDATA[WAN]]></descr></wan>
    <lan><if>em1</if></lan>
    <opt1><if>ixl2</if></opt1>
    <opt2><if>igb3</if></opt2>
    <bridge0><if>bridge0</if></bridge0>
  </interfaces>
  <gateways>
    <latencyhigh>400</latencyhigh>
    <losshigh>15</losshigh>
    <gateway_item>
      <interface>wan</interface>
      <name>WAN_DHCP</name>
      <latencyhigh>300</latencyhigh>
    </gateway_item>
    <gateway_item>
      <interface>opt1</interface>
      <name>OPT1_GW</name>
      <losshigh>abc</losshigh>
    </gateway_item>
    <gateway_item>
      <interface>opt2</interface>
    </gateway_item>
  </gateways>
  <dyndnses>
    <dyndns>
      <type>custom</type>
      <interface>wan</interface>
      <id>0</id>
      <enable></enable>
    </dyndns>
    <dyndns>
      <type>custom-v6</type>
      <interface>opt1</interface>
      <id>1</id>
    </dyndns>
    <dyndns>
      <type>custom</type>
      <interface>opt2</interface>
      <id>2</id>
    </dyndns>
  </dyndnses>
</pfsense>
"#;

    fn sample() -> ConfigXml {
        ConfigXml::parse(SAMPLE).unwrap()
    }

    #[test]
    fn test_element_tree() {
        let root = Element::parse("<a><b>one</b><b> two </b><c/></a>").unwrap();
        assert_eq!(root.name, "a");
        assert_eq!(root.children_named("b").count(), 2);
        assert_eq!(root.child_text("b"), Some("one"));
        assert_eq!(root.child_text("c"), None);
        assert!(root.child("c").is_some());
    }

    #[test]
    fn test_malformed_document_is_error() {
        assert!(ConfigXml::parse("<pfsense><gateways></pfsense>").is_err());
        assert!(ConfigXml::parse("").is_err());
    }

    #[test]
    fn test_thresholds() {
        let thresholds = sample().thresholds();

        assert_eq!(thresholds.defaults.latency_high_ms, Some(400));
        assert_eq!(thresholds.defaults.loss_high_pct, Some(15));

        let wan = thresholds.gateways["WAN_DHCP"];
        assert_eq!(wan.latency_high_ms, Some(300));
        assert_eq!(wan.loss_high_pct, None);

        // Non-numeric values are dropped, not fatal
        let opt1 = thresholds.gateways["OPT1_GW"];
        assert_eq!(opt1.loss_high_pct, None);

        // Unnamed items are skipped
        assert_eq!(thresholds.gateways.len(), 2);
    }

    #[test]
    fn test_thresholds_without_gateways_section() {
        let config = ConfigXml::parse("<pfsense/>").unwrap();
        assert_eq!(config.thresholds(), ThresholdConfig::default());
    }

    #[test]
    fn test_gateway_interfaces() {
        let map = sample().gateway_interfaces();
        assert_eq!(map.len(), 2);
        assert_eq!(map["WAN_DHCP"], "wan");
        assert_eq!(map["OPT1_GW"], "opt1");
    }

    #[test]
    fn test_physical_to_logical_only_assignable_tags() {
        let map = sample().physical_to_logical();
        assert_eq!(map["em0"], "wan");
        assert_eq!(map["em1"], "lan");
        assert_eq!(map["ixl2"], "opt1");
        assert_eq!(map["igb3"], "opt2");
        assert!(!map.contains_key("bridge0"));
    }

    #[test]
    fn test_cache_ids_only_custom_entries() {
        let map = sample().cache_ids();
        assert_eq!(map.len(), 2);
        assert_eq!(map["wan"], "0");
        assert_eq!(map["opt2"], "2");
    }

    #[test]
    fn test_ipv6_requires_enabled_v6_entry() {
        // The -v6 entry exists but is not enabled
        assert!(!sample().ipv6_dyndns_configured());

        let enabled = ConfigXml::parse(
            "<pfsense><dyndnses><dyndns><type>Custom-V6</type><enable/></dyndns></dyndnses></pfsense>",
        )
        .unwrap();
        assert!(enabled.ipv6_dyndns_configured());
    }
}
