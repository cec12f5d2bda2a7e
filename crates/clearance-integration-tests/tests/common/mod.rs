//! Shared harness: an engine on a manual clock with local ports.

#![allow(dead_code)]

use std::sync::Arc;

use clearance_core::{
    Address, Amount, DutyMode, EmailAddress, HsCode, ManualClock, Party, Session, ShipmentId,
    Timestamp,
};
use clearance_ports::{
    BroadcastChangeBus, HmacPaymentGateway, InMemoryDocumentStore, RecordingNotifier,
};
use clearance_state::{
    Classification, ClearanceEngine, EngineConfig, EnginePorts, GatewayCallback, Goods,
    InMemoryShipmentRepository, PaymentKind, Shipment, ShipmentDraft, ShipmentStatus,
    TransitionEvidence,
};

pub const INITIAL_DOCUMENTS: [&str; 3] =
    ["Commercial Invoice", "Packing List", "Certificate of Origin"];

pub struct Harness {
    pub engine: Arc<ClearanceEngine>,
    pub repo: Arc<InMemoryShipmentRepository>,
    pub clock: ManualClock,
    pub gateway: Arc<HmacPaymentGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub bus: BroadcastChangeBus,
    pub store: Arc<InMemoryDocumentStore>,
}

pub fn start() -> Timestamp {
    Timestamp::parse("2026-07-01T09:00:00Z").unwrap()
}

pub fn harness() -> Harness {
    harness_with(EngineConfig::default())
}

pub fn harness_with(config: EngineConfig) -> Harness {
    let clock = ManualClock::new(start());
    let gateway = Arc::new(HmacPaymentGateway::new("key_test", b"gw-secret".to_vec()).unwrap());
    let notifier = Arc::new(RecordingNotifier::new());
    let bus = BroadcastChangeBus::new(256);
    let repo = Arc::new(InMemoryShipmentRepository::new());
    let store = Arc::new(InMemoryDocumentStore::new(
        "https://docs.test",
        b"doc-key".to_vec(),
        Arc::new(clock.clone()),
    ));
    let ports = EnginePorts {
        documents: store.clone(),
        gateway: gateway.clone(),
        notifier: notifier.clone(),
        changes: Arc::new(bus.clone()),
    };
    let engine = ClearanceEngine::new(config, repo.clone(), ports, Arc::new(clock.clone()));
    Harness {
        engine: Arc::new(engine),
        repo,
        clock,
        gateway,
        notifier,
        bus,
        store,
    }
}

pub fn sender() -> Session {
    Session::sender("acct-1")
}

pub fn receiver() -> Session {
    Session::receiver("buyer@kline.example")
}

pub fn agency() -> Session {
    Session::agency("officer-7")
}

pub fn party(name: &str, email: &str, country: &str) -> Party {
    Party {
        name: name.to_string(),
        email: EmailAddress::new(email).unwrap(),
        phone: "+91 98200 00000".to_string(),
        address: Address {
            line1: "1 Dock Street".to_string(),
            city: "Mumbai".to_string(),
            state: "MH".to_string(),
            postal_code: "400001".to_string(),
            country: country.to_string(),
        },
    }
}

pub fn draft(duty_mode: DutyMode) -> ShipmentDraft {
    ShipmentDraft {
        sender: party("Asha Exports", "ops@asha.example", "IN"),
        receiver: party("Kline GmbH", "buyer@kline.example", "DE"),
        duty_mode,
        goods: Goods {
            category: "Apparel".to_string(),
            description: "Cotton t-shirts".to_string(),
            composition: None,
            declared_value: Amount::from_minor(1_000_000),
            weight_grams: 2_400,
            dimensions: None,
        },
        classification: Classification {
            origin_hs_code: HsCode::new("610910").unwrap(),
            destination_hs_code: HsCode::new("61091000").unwrap(),
        },
    }
}

impl Harness {
    pub fn book(&self, mode: DutyMode) -> ShipmentId {
        self.engine.create_shipment(&sender(), draft(mode)).unwrap().id
    }

    pub fn go(&self, session: &Session, id: ShipmentId, to: ShipmentStatus) -> Shipment {
        self.engine
            .request_transition(session, id, to, TransitionEvidence::default())
            .unwrap_or_else(|e| panic!("-> {to}: {e}"))
    }

    pub fn upload_initial(&self, id: ShipmentId) {
        for doc in INITIAL_DOCUMENTS {
            self.engine
                .submit_document(&sender(), id, doc, b"%PDF-1.7")
                .unwrap();
        }
    }

    pub fn callback(&self, order_id: &str, payment_id: &str) -> GatewayCallback {
        GatewayCallback {
            order_id: order_id.to_string(),
            payment_id: payment_id.to_string(),
            signature: self.gateway.sign(order_id, payment_id).unwrap(),
        }
    }

    pub fn pay(&self, session: &Session, id: ShipmentId, kind: PaymentKind) -> Shipment {
        let checkout = self.engine.create_payment_order(session, id, kind).unwrap();
        let callback = self.callback(&checkout.order.order_id, "pay_1");
        self.engine.confirm_payment(session, id, callback).unwrap()
    }

    pub fn to_document_approved(&self, mode: DutyMode) -> ShipmentId {
        let id = self.book(mode);
        self.go(&agency(), id, ShipmentStatus::HsApproved);
        self.upload_initial(id);
        self.go(&sender(), id, ShipmentStatus::DocumentUploaded);
        self.go(&agency(), id, ShipmentStatus::DocumentApproved);
        id
    }

    pub fn to_import_clearance(&self, mode: DutyMode) -> ShipmentId {
        let id = self.to_document_approved(mode);
        self.pay(&sender(), id, PaymentKind::Shipping);
        self.go(&agency(), id, ShipmentStatus::InTransit);
        self.go(&agency(), id, ShipmentStatus::ArrivedAtCustoms);
        self.go(&agency(), id, ShipmentStatus::ImportClearance);
        id
    }

    /// Store a booked shipment forced into `status`.
    pub fn seed_in(&self, status: ShipmentStatus) -> ShipmentId {
        use clearance_state::ShipmentRepository;
        let id = self.repo.next_id();
        let mut shipment = Shipment::new(id, "acct-1", draft(DutyMode::Ddp), start());
        shipment.status = status;
        self.repo.insert(shipment).unwrap();
        id
    }
}

/// Sequence numbers run 1..=n, timestamps never decrease, and every event
/// starts where the previous one ended.
pub fn assert_event_log_consistent(shipment: &Shipment) {
    let events = &shipment.events;
    assert!(!events.is_empty());
    assert_eq!(events[0].to, ShipmentStatus::Created);
    assert!(events[0].from.is_none());
    for (i, pair) in events.windows(2).enumerate() {
        assert_eq!(pair[0].sequence as usize, i + 1);
        assert_eq!(pair[1].sequence, pair[0].sequence + 1);
        assert!(pair[1].timestamp >= pair[0].timestamp);
        assert_eq!(pair[1].from, Some(pair[0].to));
    }
    assert_eq!(events.last().map(|e| e.to), Some(shipment.status));
}
