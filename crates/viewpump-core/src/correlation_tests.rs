    use super::*;
    use serde_json::json;

    fn pending(table: &CorrelationTable, value: u64) -> oneshot::Receiver<ReplyOutcome> {
        let (tx, rx) = oneshot::channel();
        table.register(Ticket::new(value), tx).unwrap();
        rx
    }

    #[test]
    fn test_register_and_resolve() {
        let table = CorrelationTable::new();
        let mut rx = pending(&table, 1);

        assert!(table.resolve(Ticket::new(1), Ok(json!(2))));
        assert_eq!(rx.try_recv().unwrap().unwrap(), json!(2));
        assert!(table.is_empty());
    }

    #[test]
    fn test_duplicate_ticket_rejected() {
        let table = CorrelationTable::new();
        let _rx = pending(&table, 7);

        let (tx, _rx2) = oneshot::channel();
        let err = table.register(Ticket::new(7), tx).unwrap_err();
        assert!(matches!(err, ViewError::DuplicateTicket(t) if t == Ticket::new(7)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_resolve_fires_exactly_once() {
        let table = CorrelationTable::new();
        let mut rx = pending(&table, 3);

        assert!(table.resolve(Ticket::new(3), Ok(json!("first"))));
        assert!(!table.resolve(Ticket::new(3), Ok(json!("second"))));
        assert_eq!(rx.try_recv().unwrap().unwrap(), json!("first"));
    }

    #[test]
    fn test_unknown_ticket_is_dropped() {
        let table = CorrelationTable::new();
        assert!(!table.resolve(Ticket::new(42), Ok(Value::Null)));
    }

    #[test]
    fn test_out_of_order_resolution() {
        let table = CorrelationTable::new();
        let mut first = pending(&table, 1);
        let mut second = pending(&table, 2);
        let mut third = pending(&table, 3);

        assert!(table.resolve(Ticket::new(3), Ok(json!(30))));
        assert!(table.resolve(Ticket::new(1), Ok(json!(10))));
        assert!(table.resolve(Ticket::new(2), Err(ViewError::Script(json!("boom")))));

        assert_eq!(first.try_recv().unwrap().unwrap(), json!(10));
        assert_eq!(
            second.try_recv().unwrap().unwrap_err().script_error(),
            Some(&json!("boom"))
        );
        assert_eq!(third.try_recv().unwrap().unwrap(), json!(30));
    }

    #[test]
    fn test_cancel_does_not_notify() {
        let table = CorrelationTable::new();
        let mut rx = pending(&table, 5);

        assert!(table.cancel(Ticket::new(5)));
        assert!(!table.cancel(Ticket::new(5)));
        // the sender was dropped without a value
        assert!(matches!(
            rx.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
        assert!(!table.resolve(Ticket::new(5), Ok(Value::Null)));
    }

    #[test]
    fn test_resolve_after_caller_dropped() {
        let table = CorrelationTable::new();
        let rx = pending(&table, 9);
        drop(rx);

        // still counts as a pending ticket being settled
        assert!(table.resolve(Ticket::new(9), Ok(Value::Null)));
    }

    #[test]
    fn test_fail_all() {
        let table = CorrelationTable::new();
        let mut a = pending(&table, 1);
        let mut b = pending(&table, 2);

        assert_eq!(table.fail_all(|| ViewError::Closed), 2);
        assert!(table.is_empty());
        assert!(matches!(a.try_recv().unwrap(), Err(ViewError::Closed)));
        assert!(matches!(b.try_recv().unwrap(), Err(ViewError::Closed)));
        assert_eq!(table.fail_all(|| ViewError::Closed), 0);
    }

    #[test]
    fn test_contains() {
        let table = CorrelationTable::new();
        let _rx = pending(&table, 11);
        assert!(table.contains(Ticket::new(11)));
        assert!(!table.contains(Ticket::new(12)));
    }
