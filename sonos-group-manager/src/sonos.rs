//! Device ports backed by real zone players

use std::collections::BTreeSet;
use std::sync::Arc;

use sonos_control::{
    Device, EventHandler, EventVariables, NotifyServer, Service, SonosClient,
    SubscriptionManager, ZoneRegistry,
};

use crate::config::GroupManagerConfig;
use crate::error::{ManagerError, Result};
use crate::event_queue::EventQueue;
use crate::notification::Notification;
use crate::port::{NotificationSubscriber, SubscriptionHandle, Topic, ZoneControl, ZoneStatus};
use crate::topology::{ZoneGroup, ZoneId};

/// The household as seen through its zone players
///
/// Grouping queries go to one representative player. Zones are the visible
/// players only: bonded satellites, subs and bridges never show up.
pub struct SonosNetwork {
    client: SonosClient,
    registry: ZoneRegistry,
    zones: Vec<ZoneId>,
    representative: ZoneId,
    subscriptions: SubscriptionManager,
}

impl SonosNetwork {
    /// Resolve the visible zones among `devices` and start event delivery
    pub fn connect(devices: &[Device], config: &GroupManagerConfig) -> Result<Self> {
        let first = devices.first().ok_or(ManagerError::NoZonesDiscovered)?;

        let client = SonosClient::new();
        let registry = ZoneRegistry::from_devices(devices);

        let groups = client.get_zone_groups(&first.ip)?;
        registry.refresh_from_groups(&groups);

        let discovered: BTreeSet<&str> = devices.iter().map(|d| d.ip.as_str()).collect();
        let zones: Vec<ZoneId> = groups
            .iter()
            .flat_map(|g| g.visible_members())
            .filter(|m| discovered.contains(m.ip.as_str()))
            .map(|m| m.ip.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let representative = zones.first().cloned().ok_or(ManagerError::NoZonesDiscovered)?;

        let server = NotifyServer::start(config.callback_port_range, &representative)?;
        let timeout = u32::try_from(config.subscription_timeout.as_secs()).unwrap_or(u32::MAX);
        let subscriptions =
            SubscriptionManager::new(client.soap_client().clone(), server, timeout)?;

        Ok(Self {
            client,
            registry,
            zones,
            representative,
            subscriptions,
        })
    }

    /// Visible zones, in address order
    pub fn zones(&self) -> &[ZoneId] {
        &self.zones
    }

    pub fn callback_url(&self) -> &str {
        self.subscriptions.callback_url()
    }

    fn live_groups(&self) -> Result<Vec<sonos_control::ZoneGroup>> {
        let groups = self.client.get_zone_groups(&self.representative)?;
        self.registry.refresh_from_groups(&groups);
        Ok(groups)
    }
}

impl ZoneControl for SonosNetwork {
    fn query_groups(&self) -> Result<Vec<ZoneGroup>> {
        Ok(self
            .live_groups()?
            .iter()
            .filter_map(|group| {
                let coordinator = group.coordinator()?;
                if !coordinator.is_visible_zone() {
                    return None;
                }
                Some(ZoneGroup::new(
                    coordinator.ip.clone(),
                    group.visible_members().map(|m| m.ip.clone()),
                ))
            })
            .collect())
    }

    fn zone_statuses(&self) -> Result<Vec<ZoneStatus>> {
        let coordinators: BTreeSet<String> = self
            .live_groups()?
            .iter()
            .filter_map(|g| g.coordinator().map(|c| c.ip.clone()))
            .collect();

        self.zones
            .iter()
            .map(|zone| -> Result<ZoneStatus> {
                Ok(ZoneStatus {
                    id: zone.clone(),
                    is_coordinator: coordinators.contains(zone),
                    transport_state: self.client.get_transport_info(zone)?,
                })
            })
            .collect()
    }

    fn join(&self, zone: &str, coordinator: &str) -> Result<()> {
        let coordinator_uuid = self.registry.uuid_for(coordinator)?;
        self.client.join(zone, &coordinator_uuid)?;
        Ok(())
    }

    fn unjoin(&self, zone: &str) -> Result<()> {
        self.client.unjoin(zone)?;
        Ok(())
    }
}

impl NotificationSubscriber for SonosNetwork {
    fn subscribe(
        &self,
        topic: Topic,
        zone: &str,
        queue: Arc<EventQueue<Notification>>,
    ) -> Result<SubscriptionHandle> {
        let service = match topic {
            Topic::Topology => Service::ZoneGroupTopology,
            Topic::Transport => Service::AVTransport,
        };

        let source = zone.to_string();
        let handler: EventHandler = Arc::new(move |variables: EventVariables| {
            queue.enqueue(&source, Notification::from(variables));
        });

        let id = self.subscriptions.subscribe(zone, service, handler)?;
        Ok(SubscriptionHandle {
            id,
            topic,
            zone: zone.to_string(),
        })
    }
}
