use crate::entities::return_order;
use crate::errors::ServiceError;
use crate::models::status::StatusConf;

/// Transition rules for the confirmation status of a return order.
///
/// `Draft -> Confirm -> Cancel`, with `Cancel` reachable from either earlier
/// state and terminal. These checks run against a freshly read header before
/// any write transaction opens; the repository re-checks them in the `WHERE`
/// clause of the write itself.
pub fn can_edit(order: &return_order::Model) -> bool {
    !order.status_conf_id.is_terminal()
}

pub fn can_confirm(order: &return_order::Model) -> bool {
    order.status_conf_id == StatusConf::Draft
}

/// Double cancel is rejected rather than ignored, since every cancel writes an
/// audit record.
pub fn can_cancel(order: &return_order::Model) -> bool {
    !order.status_conf_id.is_terminal() && order.cancel_id.is_none()
}

pub fn ensure_can_edit(order: &return_order::Model) -> Result<(), ServiceError> {
    if can_edit(order) {
        Ok(())
    } else {
        Err(ServiceError::already_cancelled(&order.order_no))
    }
}

pub fn ensure_can_confirm(order: &return_order::Model) -> Result<(), ServiceError> {
    match order.status_conf_id {
        StatusConf::Draft => Ok(()),
        StatusConf::Cancel => Err(ServiceError::already_cancelled(&order.order_no)),
        StatusConf::Confirm => Err(ServiceError::not_in_draft(&order.order_no)),
    }
}

pub fn ensure_can_cancel(order: &return_order::Model) -> Result<(), ServiceError> {
    if can_cancel(order) {
        Ok(())
    } else {
        Err(ServiceError::already_cancelled(&order.order_no))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::models::status::StatusReturn;
    use chrono::Utc;
    use rstest::rstest;

    fn order(status: StatusConf, cancel_id: Option<i32>) -> return_order::Model {
        return_order::Model {
            order_no: "AB0001".into(),
            so_no: "SO-1".into(),
            sr_no: None,
            tracking_no: None,
            customer_id: "CUST-1".into(),
            channel_id: 1,
            warehouse_id: 1,
            logistic: "FLASH".into(),
            reason: "damaged".into(),
            so_status_id: None,
            mkp_status_id: None,
            status_return_id: if status == StatusConf::Cancel {
                StatusReturn::Cancelled
            } else {
                StatusReturn::Pending
            },
            status_conf_id: status,
            opt_status_id: None,
            ax_status_id: None,
            platf_status_id: None,
            status_check_id: None,
            cancel_id,
            create_by: "alice".into(),
            create_date: Utc::now(),
            update_by: None,
            update_date: None,
            confirm_by: None,
            confirm_date: None,
            check_by: None,
            version: 1,
        }
    }

    #[rstest]
    #[case(StatusConf::Draft, true, true, true)]
    #[case(StatusConf::Confirm, true, false, true)]
    #[case(StatusConf::Cancel, false, false, false)]
    fn predicates_follow_status(
        #[case] status: StatusConf,
        #[case] edit: bool,
        #[case] confirm: bool,
        #[case] cancel: bool,
    ) {
        let cancel_id = (status == StatusConf::Cancel).then_some(1);
        let o = order(status, cancel_id);
        assert_eq!(can_edit(&o), edit);
        assert_eq!(can_confirm(&o), confirm);
        assert_eq!(can_cancel(&o), cancel);
    }

    #[test]
    fn linked_cancel_record_blocks_cancel() {
        let o = order(StatusConf::Draft, Some(7));
        assert!(!can_cancel(&o));
    }

    #[test]
    fn violations_are_conflicts_with_stable_messages() {
        let cancelled = order(StatusConf::Cancel, Some(1));
        let err = ensure_can_edit(&cancelled).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "Conflict: order AB0001 is already cancelled");

        let confirmed = order(StatusConf::Confirm, None);
        let err = ensure_can_confirm(&confirmed).unwrap_err();
        assert_eq!(err.to_string(), "Conflict: order AB0001 not in draft");

        assert_eq!(
            ensure_can_cancel(&cancelled).unwrap_err().kind(),
            ErrorKind::Conflict
        );
        assert!(ensure_can_cancel(&confirmed).is_ok());
    }
}
