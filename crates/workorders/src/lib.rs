//! `fixdesk-workorders`: costed, scheduled repair work derived from calls.

pub mod workorder;

pub use workorder::{
    WorkOrder, WorkOrderCommand, WorkOrderEvent, WorkOrderId, WorkOrderNumber, WorkOrderStatus,
};
