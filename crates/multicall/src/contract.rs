use alloy_sol_types::sol;

sol! {
    /// `MultiSendCallOnly` shares the `multiSend(bytes)` selector with `MultiSend`.
    interface IMultiSendCallOnly {
        function multiSend(bytes memory transactions) external payable;
    }
}
