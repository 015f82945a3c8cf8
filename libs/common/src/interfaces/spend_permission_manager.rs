use alloy_sol_types::sol;

sol! {
    /// Smart-wallet spend permissions. Only callable for accounts that
    /// implement the permission hooks.
    interface ISpendPermissionManager {
        function getSpendPermission(address account, address spender, address token) external view returns (uint256);

        function approve(address account, address spender, address token, uint256 allowance, uint256 period) external returns (bytes32);

        function revoke(address account, address spender, address token) external;
    }
}
